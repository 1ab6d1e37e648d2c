// src/models/mod.rs

//! Domain models for the gradewatch application.

mod config;
mod record;

// Re-export all public types
pub use config::{
    ActiveWindow, Config, Credentials, CredentialsConfig, HttpConfig, NotifyConfig, PollConfig,
    PortalConfig, StorageConfig,
};
pub use record::{BLANK_MARK, CourseRecord, format_report};
