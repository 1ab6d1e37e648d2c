// src/error.rs

//! Unified error handling for the gradewatch application.

use std::fmt;

use thiserror::Error;

/// Result type alias for gradewatch operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No link matching the given path exists on the current page.
    ///
    /// During the authentication probe this is a signal, not a failure:
    /// it means the restored session is stale and a full login is needed.
    #[error("No link matching '{0}' on the current page")]
    LinkNotFound(String),

    /// No form matching the given selector exists on the current page.
    #[error("No form matching '{0}' on the current page")]
    FormNotFound(String),

    /// Page navigation failed (redirect loop, no page loaded, ...)
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Course-history table extraction failed
    #[error("Extraction error: {0}")]
    Extract(String),

    /// Notification dispatch failed
    #[error("Notification error: {0}")]
    Notify(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a navigation error.
    pub fn navigation(message: impl Into<String>) -> Self {
        Self::Navigation(message.into())
    }

    /// Create an extraction error.
    pub fn extract(message: impl Into<String>) -> Self {
        Self::Extract(message.into())
    }

    /// Create a notification error.
    pub fn notify(message: impl Into<String>) -> Self {
        Self::Notify(message.into())
    }

    /// Whether this error is a transport-level connectivity failure.
    ///
    /// Connectivity failures get a short backoff in the scheduler;
    /// everything else is classified separately but handled the same way.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}
