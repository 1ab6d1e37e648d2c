// src/storage/mod.rs

//! Persistent state: the cookie snapshot and the record store.
//!
//! Both live as JSON files and are written atomically (temp file +
//! rename). Neither is ever touched concurrently; the poll loop is
//! strictly sequential.

pub mod cookies;
pub mod records;

pub use cookies::CookieFile;
pub use records::RecordStore;
