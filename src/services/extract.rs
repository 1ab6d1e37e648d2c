// src/services/extract.rs

//! Course-history table extraction.
//!
//! Pulls `CourseRecord`s out of the academic-history page. The portal
//! marks the course-history tables with a fixed `summary` attribute;
//! column order inside them is not guaranteed, so the header row is
//! scanned to discover where each required column sits.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::CourseRecord;

/// The `summary` attribute the portal puts on course-history tables.
const HISTORY_TABLE_SUMMARY: &str =
    "This table displays the student course history information.";

/// Required header columns, in the order the indices are reported.
const REQUIRED_COLUMNS: [&str; 3] = ["Course", "Title", "Grade"];

/// Zero-based positions of the three required columns in one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    course: usize,
    title: usize,
    grade: usize,
}

/// Extract all course records from the academic-history page.
///
/// Every matching table contributes records in document order. Fails
/// with [`AppError::Extract`] when a table's header lacks a required
/// column or a data row is missing a discovered cell.
pub fn extract_records(page: &str) -> Result<Vec<CourseRecord>> {
    let document = Html::parse_document(page);

    let table_selector = parse_selector(&format!(
        "table[summary=\"{HISTORY_TABLE_SUMMARY}\"]"
    ))?;
    let row_selector = parse_selector("tr")?;
    let header_selector = parse_selector("th")?;
    let cell_selector = parse_selector("td")?;

    let mut records = Vec::new();

    for table in document.select(&table_selector) {
        let rows: Vec<ElementRef> = table.select(&row_selector).collect();
        let Some((header, data_rows)) = rows.split_first() else {
            continue;
        };

        let layout = discover_columns(header, &header_selector)?;

        // The final row is a non-data footer and is always excluded.
        let data_count = data_rows.len().saturating_sub(1);
        for (row_number, row) in data_rows.iter().take(data_count).enumerate() {
            let cells: Vec<String> = row
                .select(&cell_selector)
                .map(|cell| cell.text().collect::<String>())
                .collect();

            records.push(CourseRecord::new(
                cell_at(&cells, layout.course, "Course", row_number)?,
                cell_at(&cells, layout.title, "Title", row_number)?,
                cell_at(&cells, layout.grade, "Grade", row_number)?,
            ));
        }
    }

    Ok(records)
}

/// Scan the header row for the positions of the required columns.
fn discover_columns(header: &ElementRef, header_selector: &Selector) -> Result<ColumnLayout> {
    let mut course = None;
    let mut title = None;
    let mut grade = None;

    for (index, cell) in header.select(header_selector).enumerate() {
        let text: String = cell.text().collect();
        match text.trim() {
            "Course" => course = Some(index),
            "Title" => title = Some(index),
            "Grade" => grade = Some(index),
            _ => {}
        }
    }

    match (course, title, grade) {
        (Some(course), Some(title), Some(grade)) => Ok(ColumnLayout {
            course,
            title,
            grade,
        }),
        _ => {
            let missing: Vec<&str> = [course, title, grade]
                .iter()
                .zip(REQUIRED_COLUMNS)
                .filter(|(found, _)| found.is_none())
                .map(|(_, name)| name)
                .collect();
            Err(AppError::extract(format!(
                "header row is missing required column(s): {}",
                missing.join(", ")
            )))
        }
    }
}

fn cell_at(cells: &[String], index: usize, column: &str, row_number: usize) -> Result<String> {
    cells.get(index).cloned().ok_or_else(|| {
        AppError::extract(format!(
            "data row {row_number} has {} cells, but the {column} column is at index {index}",
            cells.len()
        ))
    })
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
