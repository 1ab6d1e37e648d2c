//! Course record data structure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The mark cell content the portal renders for a course that has not
/// been graded yet (a single non-breaking space collapses to this).
pub const BLANK_MARK: &str = " ";

/// One parsed entry from the course-history table.
///
/// Records are value objects: equality is structural over the
/// (code, title, mark) triple and nothing else. A grade change for the
/// same course therefore produces a distinct record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseRecord {
    /// Course code (e.g. "COMP103")
    pub code: String,

    /// Course display title
    pub title: String,

    /// Grade cell text; [`BLANK_MARK`] when not yet graded
    pub mark: String,
}

impl CourseRecord {
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        mark: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            mark: mark.into(),
        }
    }

    /// A record is complete once the portal shows an actual mark.
    /// Incomplete records are never stored or reported.
    pub fn is_complete(&self) -> bool {
        self.mark != BLANK_MARK
    }

    /// Single report line: `Title: Mark`.
    pub fn report_line(&self) -> String {
        format!("{}: {}", self.title, self.mark)
    }

    /// Report line padded between `: ` and the mark so the whole line
    /// reaches `width`, aligning marks into a column across a batch.
    fn report_line_padded(&self, width: usize) -> String {
        let pad = width.saturating_sub(self.report_line().len());
        format!("{}: {}{}", self.title, " ".repeat(pad), self.mark)
    }
}

impl fmt::Display for CourseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.is_complete() {
            self.mark.as_str()
        } else {
            "[none]"
        };
        write!(f, "{}: {}: {}", self.code, self.title, mark)
    }
}

/// Format a batch of records for a notification body, one line per
/// record with the marks column-aligned.
pub fn format_report(records: &[CourseRecord]) -> String {
    let width = records
        .iter()
        .map(|r| r.report_line().len())
        .max()
        .unwrap_or(0);

    records
        .iter()
        .map(|r| r.report_line_padded(width) + "\n")
        .collect()
}
