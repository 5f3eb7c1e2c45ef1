//! Logging initialization
//!
//! Two independent sinks: `tracing` for human-facing operational logs, and
//! [`JsonlSink`] for the append-only structured streams (trades, strategy
//! decisions, oracle ticks, errors) the dashboard and offline analysis read.

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with standard configuration (defaults to info level)
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Initialize tracing with a specific log level
///
/// The level can be: error, warn, info, debug, trace
/// RUST_LOG environment variable can override the configured level
pub fn init_tracing_with_level(level: &str) {
    // Build filter: use RUST_LOG if set, otherwise use the provided level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            // Default filter for our crates at the specified level
            // sqlx=warn silences the verbose query logs at debug level
            EnvFilter::new(format!(
                "sqlx=warn,polymarket={level},polymarket_arb_bot={level},hypersockets={level},{level}",
                level = level
            ))
        });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)  // Show module path for context
        .with_thread_ids(false)
        .with_line_number(false)
        .init();
}

/// Append-only JSONL writer for one structured stream (e.g. `trades.jsonl`).
///
/// A write failure that looks disk-full or out-of-memory is surfaced to the
/// caller as fatal; any other IO error is logged and swallowed — a logging
/// hiccup must never take down a trading lane.
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl JsonlSink {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().append(true).create(true).open(&path)?;
        Ok(Self { path, file: Mutex::new(file) })
    }

    /// Returns `Err` only for disk-full/out-of-memory conditions, which the
    /// caller should treat as fatal. Any other error is logged and ignored.
    pub fn write<T: Serialize>(&self, record: &T) -> std::io::Result<()> {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to serialize JSONL record");
                return Ok(());
            }
        };
        let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match writeln!(file, "{line}").and_then(|_| file.flush()) {
            Ok(()) => Ok(()),
            Err(e) if matches!(e.kind(), std::io::ErrorKind::StorageFull | std::io::ErrorKind::OutOfMemory) => {
                error!(path = %self.path.display(), error = %e, "fatal JSONL write failure");
                Err(e)
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "JSONL write failed, dropping record");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod jsonl_tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Record {
        value: u32,
    }

    #[test]
    fn writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.jsonl");
        let sink = JsonlSink::open(&path).unwrap();
        sink.write(&Record { value: 1 }).unwrap();
        sink.write(&Record { value: 2 }).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("\"value\":1"));
    }
}
