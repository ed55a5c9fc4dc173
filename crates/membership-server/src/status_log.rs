//! Append-only server status file.
//!
//! Startup, bind failures and panics are written here as
//! `[<rfc3339>] <message>` lines so they survive log rotation of stdout.

use chrono::{SecondsFormat, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct StatusLog {
    path: PathBuf,
}

impl StatusLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line. Failures are logged and otherwise ignored.
    pub fn record(&self, message: &str) {
        if let Err(e) = self.append(message) {
            warn!("Failed to write status log {:?}: {}", self.path, e);
        }
    }

    fn append(&self, message: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(
            file,
            "[{}] {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            message
        )
    }

    /// Record every panic before the previous hook runs.
    pub fn install_panic_hook(&self) {
        let log = self.clone();
        let previous = std::panic::take_hook();

        std::panic::set_hook(Box::new(move |info| {
            log.record(&format!("Panic: {}", info));
            previous(info);
        }));
    }
}
