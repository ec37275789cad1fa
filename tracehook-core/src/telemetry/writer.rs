//! File-backed telemetry output.
//!
//! Appends one JSON document per line (newline-terminated for log shippers
//! such as Promtail). Write failures are logged and dropped; the span that
//! produced the record never sees them.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

use super::record::TelemetryRecord;
use super::sink::TelemetrySink;
use crate::error::SinkError;

/// Sink appending JSON lines to a file.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Open (or create) `path` for appending, creating parent directories.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| SinkError::Open {
                    path: path.clone(),
                    source,
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SinkError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize and append one record.
    pub fn write_record(&self, record: &TelemetryRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        file.write_all(&line)?;
        Ok(())
    }
}

impl TelemetrySink for JsonLinesSink {
    fn track(&self, record: TelemetryRecord) {
        if let Err(e) = self.write_record(&record) {
            warn!(
                path = %self.path.display(),
                span_id = record.span_id(),
                "Dropping telemetry record: {}",
                e
            );
        }
    }
}
