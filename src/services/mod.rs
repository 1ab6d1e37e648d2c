// src/services/mod.rs

//! Portal-facing services: the web session, authentication protocol,
//! and course-history extraction.

pub mod browser;
pub mod extract;
pub mod session;

use async_trait::async_trait;

use crate::error::Result;

pub use browser::{FormMatcher, WebSession};
pub use extract::extract_records;
pub use session::{ProbeOutcome, SessionManager};

/// Source of the authenticated academic-history page.
///
/// Implemented by [`SessionManager`]; poll-cycle tests substitute fixture
/// documents through this seam.
#[async_trait]
pub trait PageSource: Send {
    /// Produce the current academic-history page markup.
    async fn fetch_history_page(&mut self) -> Result<String>;
}
