// src/storage/cookies.rs

//! Cookie snapshot persistence.
//!
//! The session's cookie map is saved after every successful
//! authentication and restored at the start of the next one, letting a
//! restarted process skip the full login. A missing file is the normal
//! first-run state, not an error.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::services::WebSession;

/// Cookie snapshot file handle.
pub struct CookieFile {
    path: PathBuf,
}

impl CookieFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Restore a saved snapshot into the session. No-op when the file
    /// is absent.
    pub fn load(&self, session: &mut WebSession) -> Result<()> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let cookies: HashMap<String, String> = serde_json::from_slice(&bytes)?;
                session.restore_cookies(cookies);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Overwrite the snapshot with the session's current cookies.
    pub fn save(&self, session: &WebSession) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(session.cookies())?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Delete the snapshot. Idempotent.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}
