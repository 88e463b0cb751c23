//! Transfer strategies
//!
//! Downloads have a single strategy. Uploads pick one of three:
//! - `normal`: one PUT of the whole file
//! - `append`: append the file at offset 0 of a fresh appendable object
//! - `multipart`: parallel part uploads, completed in part-number order
//!
//! Strategies only move bytes and report counts; the orchestrator compares
//! the counts with the expected size.

mod download;
mod multipart;
mod upload;

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};

pub use download::{download_object, download_url};
pub use multipart::{
    DEFAULT_PARALLEL, DEFAULT_PART_SIZE, MAX_PARTS, MIN_PART_SIZE, MultipartSettings, PartRange,
    plan_parts, upload_multipart,
};
pub use upload::{UploadSource, upload};

/// File name used when neither the local path nor the target names one
pub const DEFAULT_DOWNLOAD_NAME: &str = "rcprobe-download.dat";

/// Probe direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Download,
    Upload,
}

impl Direction {
    /// Exactly one of the two flags must be set
    pub fn from_flags(download: bool, upload: bool) -> Result<Self> {
        match (download, upload) {
            (true, false) => Ok(Direction::Download),
            (false, true) => Ok(Direction::Upload),
            (true, true) => Err(Error::Validation(
                "--download and --upload cannot be used together".into(),
            )),
            (false, false) => Err(Error::Validation(
                "One of --download or --upload is required".into(),
            )),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Download => write!(f, "download"),
            Direction::Upload => write!(f, "upload"),
        }
    }
}

/// Upload strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    #[default]
    Normal,
    Append,
    Multipart,
}

impl UploadMode {
    /// Parse an `--upmode` value. Absent or empty means normal.
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim).unwrap_or_default() {
            "" => Ok(UploadMode::Normal),
            v => v.parse(),
        }
    }
}

impl std::str::FromStr for UploadMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(UploadMode::Normal),
            "append" => Ok(UploadMode::Append),
            "multipart" => Ok(UploadMode::Multipart),
            _ => Err(Error::Validation(format!(
                "Invalid upload mode '{s}', expected normal, append or multipart"
            ))),
        }
    }
}

impl std::fmt::Display for UploadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadMode::Normal => write!(f, "normal"),
            UploadMode::Append => write!(f, "append"),
            UploadMode::Multipart => write!(f, "multipart"),
        }
    }
}

/// Strategy that ran a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Download,
    Normal,
    Append,
    Multipart,
}

impl From<UploadMode> for Strategy {
    fn from(mode: UploadMode) -> Self {
        match mode {
            UploadMode::Normal => Strategy::Normal,
            UploadMode::Append => Strategy::Append,
            UploadMode::Multipart => Strategy::Multipart,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Download => write!(f, "download"),
            Strategy::Normal => write!(f, "normal"),
            Strategy::Append => write!(f, "append"),
            Strategy::Multipart => write!(f, "multipart"),
        }
    }
}

/// Byte counts reported by a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferSummary {
    pub strategy: Strategy,
    pub bytes_transferred: u64,
    /// Size the transfer should have moved, when known
    pub expected_bytes: Option<u64>,
}

impl TransferSummary {
    /// Fail with [`Error::Integrity`] when the counts disagree
    pub fn verify(&self) -> Result<()> {
        match self.expected_bytes {
            Some(expected) if expected != self.bytes_transferred => Err(Error::Integrity {
                expected,
                actual: self.bytes_transferred,
            }),
            _ => Ok(()),
        }
    }
}

/// Decide where a download is written.
///
/// - no local path: `output_dir/<base name>`
/// - an existing directory, or a path ending in a separator: `<dir>/<base name>`
/// - anything else is used as the file path verbatim
///
/// `base_name` is the last segment of the object key or URL path;
/// [`DEFAULT_DOWNLOAD_NAME`] stands in when it is empty.
pub fn download_file_path(local_path: Option<&str>, base_name: &str, output_dir: &Path) -> PathBuf {
    let name = match base_name {
        "" | "." | ".." => DEFAULT_DOWNLOAD_NAME,
        name => name,
    };

    match local_path.filter(|p| !p.is_empty()) {
        None => output_dir.join(name),
        Some(p) if p.ends_with(['/', MAIN_SEPARATOR]) || Path::new(p).is_dir() => {
            Path::new(p).join(name)
        }
        Some(p) => PathBuf::from(p),
    }
}

/// Create the directories above `dest`
pub fn prepare_destination(dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
