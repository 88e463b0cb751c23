//! Probe log file
//!
//! Each probe writes a plain-text log next to its other artifacts, one line
//! per event: `<timestamp> <LEVEL> <message>`. Lines are mirrored to
//! `tracing` so `--debug` shows them on stderr as well.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use jiff::Timestamp;

use crate::error::Result;

/// Log file name for a probe started at `started_at`
pub fn log_file_name(started_at: Timestamp) -> String {
    format!("rcprobe-{}.log", started_at.strftime("%Y%m%d%H%M%S"))
}

/// Write a log holding one failure, for runs that stop before a probe starts
pub fn write_failure_log(
    output_dir: &Path,
    started_at: Timestamp,
    error: impl std::fmt::Display,
) -> Result<PathBuf> {
    let mut log = ProbeLog::create(output_dir.join(log_file_name(started_at)))?;
    log.info(format!("Probe started at {started_at}"));
    log.error(format!("Probe failed: {error}"));
    log.close()?;
    Ok(log.path().to_path_buf())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Open log file of one probe run
#[derive(Debug)]
pub struct ProbeLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl ProbeLog {
    /// Create (or truncate) the log file, creating parent directories
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, message: impl std::fmt::Display) {
        tracing::info!(target: "rcprobe::probe", "{message}");
        self.write(Level::Info, &message);
    }

    pub fn warn(&mut self, message: impl std::fmt::Display) {
        tracing::warn!(target: "rcprobe::probe", "{message}");
        self.write(Level::Warn, &message);
    }

    pub fn error(&mut self, message: impl std::fmt::Display) {
        tracing::error!(target: "rcprobe::probe", "{message}");
        self.write(Level::Error, &message);
    }

    fn write(&mut self, level: Level, message: &dyn std::fmt::Display) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        // A failing log write must not change the probe outcome
        if let Err(e) = writeln!(writer, "{} {:<5} {message}", Timestamp::now(), level.as_str()) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write probe log");
        }
    }

    /// Flush and close the file. Later writes are dropped.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }
}

impl Drop for ProbeLog {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to close probe log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_name() {
        let ts: Timestamp = "2026-03-01T08:09:10Z".parse().unwrap();
        assert_eq!(log_file_name(ts), "rcprobe-20260301080910.log");
    }

    #[test]
    fn test_log_lines_written_on_close() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("probe.log");

        let mut log = ProbeLog::create(&path).unwrap();
        log.info("starting");
        log.error("boom");
        log.close().unwrap();
        log.info("ignored after close");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("INFO  starting"));
        assert!(lines[1].ends_with("ERROR boom"));
    }

    #[test]
    fn test_write_failure_log() {
        let temp_dir = TempDir::new().unwrap();
        let ts: Timestamp = "2026-03-01T08:09:10Z".parse().unwrap();

        let path = write_failure_log(temp_dir.path(), ts, "Config file not found").unwrap();

        assert_eq!(path, temp_dir.path().join("rcprobe-20260301080910.log"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("ERROR Probe failed: Config file not found"));
    }
}
