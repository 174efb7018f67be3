//! On-disk session cache so a later process can restore the session.

use std::io;
use std::path::{Path, PathBuf};

use crate::identity::Session;

/// JSON file holding the last persisted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached session. A missing file means no session; an
    /// unreadable or corrupt one is logged and treated the same.
    #[must_use]
    pub fn load(&self) -> Option<Session> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session file unreadable; ignoring");
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session file corrupt; ignoring");
                None
            }
        }
    }

    /// # Errors
    ///
    /// Filesystem errors from creating the parent directory or writing.
    pub fn save(&self, session: &Session) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec_pretty(session).map_err(io::Error::other)?;
        std::fs::write(&self.path, body)
    }

    /// Remove the cached session. Already absent is fine.
    ///
    /// # Errors
    ///
    /// Filesystem errors other than not-found.
    pub fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
