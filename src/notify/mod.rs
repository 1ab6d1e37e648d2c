// src/notify/mod.rs

//! Notification dispatch.
//!
//! The poll cycle only knows the [`Notifier`] trait; the concrete
//! transport is the Telegram Bot API.

pub mod telegram;

use async_trait::async_trait;

use crate::error::Result;

pub use telegram::TelegramNotifier;

/// Subject for the epoch-0 initialization notification.
pub const INITIAL_SUBJECT: &str = "gradewatch initialised with grades";

/// Subject for the startup aliveness notification.
pub const ALIVENESS_SUBJECT: &str = "Hello from gradewatch!";

/// Outbound notification transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message. Failures propagate as ordinary errors.
    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}

/// Subject line for a batch of newly discovered results.
pub fn new_results_subject(count: usize) -> &'static str {
    if count > 1 { "New results" } else { "New result" }
}
