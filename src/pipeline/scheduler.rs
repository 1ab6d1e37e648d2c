// src/pipeline/scheduler.rs

//! The outer polling loop.
//!
//! Runs poll cycles forever, classifies failures, applies jittered
//! sleeps, and gates polling on the configured active-hours window. A
//! failed cycle never terminates the process and never advances the
//! epoch; only completed cycles do.

use std::time::Duration;

use rand::Rng;

use crate::error::{AppError, Result};
use crate::models::PollConfig;
use crate::pipeline::poll::{PollContext, run_cycle};

/// Two-tier failure classification for cycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport-level connection failure; expected to be transient.
    Connectivity,
    /// Everything else, including structural extraction errors.
    Other,
}

/// Classify a cycle failure.
pub fn classify(error: &AppError) -> FailureKind {
    if error.is_connectivity() {
        FailureKind::Connectivity
    } else {
        FailureKind::Other
    }
}

/// Uniformly random sleep after a successful cycle.
pub fn idle_duration(config: &PollConfig) -> Duration {
    let minutes = rand::rng()
        .random_range(config.idle_min_minutes as f64..config.idle_max_minutes as f64);
    Duration::from_secs_f64(minutes * 60.0)
}

/// Uniformly random backoff after a failed cycle.
pub fn backoff_duration(config: &PollConfig) -> Duration {
    let seconds = rand::rng()
        .random_range(config.backoff_min_secs as f64..config.backoff_max_secs as f64);
    Duration::from_secs_f64(seconds)
}

/// Run one scheduler step: a single poll cycle with failure absorption.
///
/// Returns the epoch to run the next cycle at and how long to pause
/// before it. The epoch advances only when the cycle completed; a
/// failed cycle is logged, classified, and re-run at the same epoch
/// after a backoff. Sleeping is left to the caller.
pub async fn step(ctx: &mut PollContext, config: &PollConfig, epoch: u64) -> (u64, Duration) {
    match run_cycle(ctx, epoch).await {
        Ok(()) => {
            let next = epoch + 1;
            let pause = idle_duration(config);
            log::info!(
                "Cycle complete; epoch is now {next}. Sleeping for {}m {}s",
                pause.as_secs() / 60,
                pause.as_secs() % 60
            );
            (next, pause)
        }
        Err(error) => {
            match classify(&error) {
                FailureKind::Connectivity => {
                    log::warn!("Connection error handled in epoch {epoch}: {error}");
                }
                FailureKind::Other => {
                    log::warn!("Other error handled in epoch {epoch}: {error}");
                }
            }
            let pause = backoff_duration(config);
            log::info!("Waiting {}s to retry", pause.as_secs());
            (epoch, pause)
        }
    }
}

/// Run the polling loop. Only returns on a configuration error while
/// resolving the active window; cycle failures are absorbed by [`step`].
pub async fn run_loop(ctx: &mut PollContext, config: &PollConfig) -> Result<()> {
    let window = config.active_window()?;
    let mut epoch: u64 = 0;

    loop {
        if !window.within_active_hours() {
            let seconds = window.seconds_until_active_hours_begin();
            log::info!(
                "Outside active hours; sleeping {}m until the window opens",
                seconds / 60
            );
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            continue;
        }

        let (next_epoch, pause) = step(ctx, config, epoch).await;
        epoch = next_epoch;
        tokio::time::sleep(pause).await;
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::notify::Notifier;
    use crate::services::PageSource;
    use crate::storage::RecordStore;

    /// Page source that always produces the same outcome.
    struct FixedSource {
        result: fn() -> Result<String>,
    }

    #[async_trait]
    impl PageSource for FixedSource {
        async fn fetch_history_page(&mut self) -> Result<String> {
            (self.result)()
        }
    }

    /// Page source whose fetch fails at the transport level.
    struct UnreachableSource;

    #[async_trait]
    impl PageSource for UnreachableSource {
        async fn fetch_history_page(&mut self) -> Result<String> {
            // Port 1 on loopback is never listening; the connect fails fast.
            let response = reqwest::Client::new()
                .get("http://127.0.0.1:1/")
                .send()
                .await?;
            Ok(response.text().await?)
        }
    }

    struct SilentNotifier;

    #[async_trait]
    impl Notifier for SilentNotifier {
        async fn send(&self, _subject: &str, _body: &str) -> Result<()> {
            Ok(())
        }
    }

    async fn context(source: Box<dyn PageSource>, tmp: &TempDir) -> PollContext {
        PollContext {
            source,
            store: RecordStore::open(tmp.path().join("records.json"))
                .await
                .unwrap(),
            notifier: Box::new(SilentNotifier),
        }
    }

    fn empty_history_page() -> Result<String> {
        Ok(
            "<table summary=\"This table displays the student course history information.\">\
             <tr><th>Course</th><th>Title</th><th>Grade</th></tr>\
             <tr><td>Totals</td><td></td><td></td></tr></table>"
                .to_string(),
        )
    }

    #[tokio::test]
    async fn step_advances_the_epoch_only_after_a_completed_cycle() {
        let tmp = TempDir::new().unwrap();
        let config = PollConfig::default();
        let source = Box::new(FixedSource {
            result: empty_history_page,
        });
        let mut ctx = context(source, &tmp).await;

        let (next, pause) = step(&mut ctx, &config, 5).await;

        assert_eq!(next, 6);
        assert!(pause >= Duration::from_secs(config.idle_min_minutes * 60));
        assert!(pause < Duration::from_secs(config.idle_max_minutes * 60));
    }

    #[tokio::test]
    async fn step_holds_the_epoch_when_extraction_fails() {
        let tmp = TempDir::new().unwrap();
        let config = PollConfig::default();
        // The history table lacks the Grade column, so extraction fails.
        let source = Box::new(FixedSource {
            result: || {
                Ok(
                    "<table summary=\"This table displays the student course history information.\">\
                     <tr><th>Course</th><th>Title</th></tr>\
                     <tr><td>COMP103</td><td>Data Structures</td></tr>\
                     <tr><td>Totals</td><td></td></tr></table>"
                        .to_string(),
                )
            },
        });
        let mut ctx = context(source, &tmp).await;

        let (next, pause) = step(&mut ctx, &config, 3).await;

        // The failed cycle re-runs at the same epoch after a backoff.
        assert_eq!(next, 3);
        assert!(pause >= Duration::from_secs(config.backoff_min_secs));
        assert!(pause < Duration::from_secs(config.backoff_max_secs));
    }

    #[tokio::test]
    async fn step_holds_the_epoch_on_connection_failure() {
        let tmp = TempDir::new().unwrap();
        let config = PollConfig::default();
        let mut ctx = context(Box::new(UnreachableSource), &tmp).await;

        let (next, pause) = step(&mut ctx, &config, 0).await;

        assert_eq!(next, 0);
        assert!(pause >= Duration::from_secs(config.backoff_min_secs));
        assert!(pause < Duration::from_secs(config.backoff_max_secs));
    }

    #[test]
    fn idle_duration_stays_in_bounds() {
        let config = PollConfig::default();
        for _ in 0..200 {
            let pause = idle_duration(&config);
            assert!(pause >= Duration::from_secs(config.idle_min_minutes * 60));
            assert!(pause < Duration::from_secs(config.idle_max_minutes * 60));
        }
    }

    #[test]
    fn backoff_duration_stays_in_bounds() {
        let config = PollConfig::default();
        for _ in 0..200 {
            let pause = backoff_duration(&config);
            assert!(pause >= Duration::from_secs(config.backoff_min_secs));
            assert!(pause < Duration::from_secs(config.backoff_max_secs));
        }
    }

    #[test]
    fn non_transport_errors_classify_as_other() {
        assert_eq!(
            classify(&AppError::extract("missing column")),
            FailureKind::Other
        );
        assert_eq!(
            classify(&AppError::LinkNotFound("/x".into())),
            FailureKind::Other
        );
        assert_eq!(classify(&AppError::config("bad")), FailureKind::Other);
    }

    #[tokio::test]
    async fn refused_connection_classifies_as_connectivity() {
        let client = reqwest::Client::new();
        // Port 1 on loopback is never listening; the connect fails fast.
        let error = client
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .expect_err("connect should fail");

        assert_eq!(classify(&AppError::from(error)), FailureKind::Connectivity);
    }
}
