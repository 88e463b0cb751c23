use std::path::{Path, PathBuf};

use super::{MultipartSettings, Strategy, TransferSummary, UploadMode, upload_multipart};
use crate::error::{Error, RejectionKind, Result};
use crate::target::RemotePath;
use crate::traits::{ObjectStore, ObjectType};

/// A local file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSource {
    pub path: PathBuf,
    pub size: u64,
}

impl UploadSource {
    /// Check that `path` is an existing regular file
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            Error::Validation(format!("Upload source {} is not readable: {e}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(Error::Validation(format!(
                "Upload source {} is not a regular file",
                path.display()
            )));
        }
        Ok(Self {
            path,
            size: metadata.len(),
        })
    }

    /// File name of the source, used to name objects
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Run the upload strategy for `mode`
pub async fn upload(
    store: &dyn ObjectStore,
    mode: UploadMode,
    source: &UploadSource,
    path: &RemotePath,
    settings: &MultipartSettings,
) -> Result<TransferSummary> {
    let bytes_transferred = match mode {
        UploadMode::Normal => upload_normal(store, source, path).await?,
        UploadMode::Append => upload_append(store, source, path).await?,
        UploadMode::Multipart => upload_multipart(store, source, path, settings).await?,
    };

    Ok(TransferSummary {
        strategy: Strategy::from(mode),
        bytes_transferred,
        expected_bytes: Some(source.size),
    })
}

async fn upload_normal(store: &dyn ObjectStore, source: &UploadSource, path: &RemotePath) -> Result<u64> {
    let data = tokio::fs::read(&source.path).await?;
    let size = data.len() as u64;
    let content_type = guess_content_type(&source.path);

    store.put_object(path, data, content_type.as_deref()).await?;
    Ok(size)
}

/// Append needs a fresh object: an existing one must be appendable and empty,
/// since the append starts at offset 0.
async fn upload_append(store: &dyn ObjectStore, source: &UploadSource, path: &RemotePath) -> Result<u64> {
    match store.head_object(path).await {
        Ok(info) if info.object_type != ObjectType::Appendable => {
            return Err(Error::conflict(format!(
                "{path} already exists and is not appendable"
            )));
        }
        Ok(info) if info.size_bytes > 0 => {
            return Err(Error::conflict(format!(
                "{path} already holds {} bytes, cannot append at offset 0",
                info.size_bytes
            )));
        }
        Ok(_) => {}
        Err(e) if e.rejection_kind() == Some(RejectionKind::NotFound) => {}
        Err(e) => return Err(e),
    }

    let data = tokio::fs::read(&source.path).await?;
    let next_position = store.append_object(path, 0, data).await?;
    tracing::debug!(object = %path, next_position, "Append finished");

    // The next append position is the object length after this write
    Ok(next_position)
}

fn guess_content_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first_raw().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_upload_source_open() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("payload.txt");
        std::fs::write(&file, b"hello").unwrap();

        let source = UploadSource::open(&file).unwrap();
        assert_eq!(source.size, 5);
        assert_eq!(source.file_name(), "payload.txt");
    }

    #[test]
    fn test_upload_source_rejects_missing_and_dirs() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            UploadSource::open(temp_dir.path().join("missing")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            UploadSource::open(temp_dir.path()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(
            guess_content_type(Path::new("a.json")).as_deref(),
            Some("application/json")
        );
        assert_eq!(guess_content_type(Path::new("noext")), None);
    }
}
