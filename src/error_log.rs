//! Append-only log of fetch and parse failures.
//!
//! Every recorded message is also emitted as a `tracing` warning, so failures
//! show up on the console as well as in the log file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing::{error, warn};

/// Destination for per-source failure messages.
pub trait ErrorSink: Send + Sync {
    fn record(&self, message: &str);
}

/// Format one log line as `[YYYY-MM-DD HH:MM:SS] message`.
pub fn format_line(timestamp: DateTime<Local>, message: &str) -> String {
    format!("[{}] {}\n", timestamp.format("%Y-%m-%d %H:%M:%S"), message)
}

/// Appends to a file that is created on the first recorded message, so a run
/// without failures leaves no file behind.
pub struct FileErrorLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    fn open(&self) -> std::io::Result<File> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        OpenOptions::new().create(true).append(true).open(&self.path)
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut slot = self.file.lock().unwrap_or_else(|e| e.into_inner());

        if slot.is_none() {
            *slot = Some(self.open()?);
        }
        match slot.as_mut() {
            Some(file) => file.write_all(line.as_bytes()),
            None => Ok(()),
        }
    }
}

impl ErrorSink for FileErrorLog {
    fn record(&self, message: &str) {
        warn!("{}", message);
        let line = format_line(Local::now(), message);
        if let Err(e) = self.append(&line) {
            error!("Failed to write error log {}: {}", self.path.display(), e);
        }
    }
}

/// Keeps messages in memory. Used by tests and dry runs.
#[derive(Default)]
pub struct MemoryErrorLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ErrorSink for MemoryErrorLog {
    fn record(&self, message: &str) {
        warn!("{}", message);
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }
}
