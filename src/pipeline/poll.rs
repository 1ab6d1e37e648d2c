// src/pipeline/poll.rs

//! One poll cycle.
//!
//! Fetches the authenticated academic-history page, extracts records,
//! filters them against the store, and dispatches at most one
//! notification. Errors from any collaborator propagate uncaught; the
//! scheduler is the single point of classification and recovery.

use chrono::Local;

use crate::error::Result;
use crate::models::{CourseRecord, format_report};
use crate::notify::{INITIAL_SUBJECT, Notifier, new_results_subject};
use crate::services::{PageSource, extract_records};
use crate::storage::RecordStore;

/// Everything one poll cycle needs, threaded explicitly instead of
/// living in process globals.
pub struct PollContext {
    pub source: Box<dyn PageSource>,
    pub store: RecordStore,
    pub notifier: Box<dyn Notifier>,
}

/// Run one poll cycle at the given epoch.
///
/// Epoch 0 is the initialization cycle: its discoveries seed the store
/// and are reported with the "initialised" notification whether or not
/// any are new. Later epochs notify only when new records appeared.
pub async fn run_cycle(ctx: &mut PollContext, epoch: u64) -> Result<()> {
    let page = ctx.source.fetch_history_page().await?;
    let records = extract_records(&page)?;

    let mut new_records: Vec<CourseRecord> = Vec::new();
    for record in &records {
        // Not yet graded: nothing meaningful to store or report.
        if !record.is_complete() {
            continue;
        }
        if ctx.store.check_and_insert(record).await? {
            new_records.push(record.clone());
        }
    }

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    if epoch > 0 {
        if new_records.is_empty() {
            log::info!("No new results at: {timestamp}");
        } else {
            log::info!("=================NEW RESULTS=================");
            log::info!("{}", format_report(&new_records));
            log::info!("=============================================");
            ctx.notifier
                .send(
                    new_results_subject(new_records.len()),
                    &format_report(&new_records),
                )
                .await?;
            log::info!("Notification sent at: {timestamp}");
        }
    } else {
        log::info!(
            "Initialized {} results at: {timestamp}",
            records.len()
        );
        log::info!("===============INITIAL RESULTS===============");
        log::info!("{}", format_report(&new_records));
        log::info!("=============================================");
        ctx.notifier
            .send(INITIAL_SUBJECT, &format_report(&new_records))
            .await?;
    }

    Ok(())
}
