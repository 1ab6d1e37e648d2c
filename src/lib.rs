// src/lib.rs

//! gradewatch library
//!
//! A polling client for a session-based student-records portal. The
//! scheduler runs poll cycles that authenticate (reusing saved cookies
//! where possible), extract the course-history table, dedup records
//! against a persistent store, and notify when new results appear.

pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod services;
pub mod storage;
