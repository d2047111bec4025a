//! Dev-build subscriber: JSONL into a file shared by every portal process.
//!
//! Each line is flushed as soon as it is written, so concurrent processes
//! appending to the same file never split each other's lines.

use crate::json_layer::JsonLayer;
use crate::{filter_or, init_stderr, LogConfig};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Append-only handle on the dev log file.
#[derive(Clone)]
pub struct DevLogFile {
    file: Arc<Mutex<LineWriter<File>>>,
}

impl DevLogFile {
    /// Open (creating parents as needed) for appending.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Arc::new(Mutex::new(LineWriter::new(file))),
        })
    }
}

impl Write for DevLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for DevLogFile {
    type Writer = DevLogFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install the JSONL subscriber, or the stderr one if the file cannot be opened.
pub fn init_dev_subscriber(config: &LogConfig) {
    let log_path = config.resolved_log_path();

    let file = match DevLogFile::open(&log_path) {
        Ok(file) => file,
        Err(e) => {
            init_stderr(config);
            tracing::warn!(
                log_path = %log_path.display(),
                error = %e,
                "Dev log file unavailable, logging to stderr"
            );
            return;
        }
    };

    let json = JsonLayer::new(config.service_name.clone(), file).with_filter(config.env_filter());
    let stderr = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(io::stderr)
            .with_filter(filter_or("warn"))
    });

    let installed = tracing_subscriber::registry().with(json).with(stderr).try_init();
    if installed.is_ok() {
        tracing::debug!(
            log_path = %log_path.display(),
            service = %config.service_name,
            "Dev logging initialized"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("nested").join("dev.jsonl");

        let mut file = DevLogFile::open(&path).unwrap();
        writeln!(file, r#"{{"message":"login succeeded"}}"#).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"message\":\"login succeeded\"}\n");
    }

    #[test]
    fn test_handles_append_to_one_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dev.jsonl");

        let mut cli = DevLogFile::open(&path).unwrap();
        let mut other = DevLogFile::open(&path).unwrap();
        writeln!(cli, "cli").unwrap();
        writeln!(other, "other").unwrap();
        writeln!(cli, "cli again").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "cli\nother\ncli again\n");
    }

    #[test]
    fn test_open_fails_when_parent_is_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        assert!(DevLogFile::open(&blocker.join("dev.jsonl")).is_err());
    }
}
