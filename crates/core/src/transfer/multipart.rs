//! Multipart upload with a bounded number of parts in flight

use std::io::SeekFrom;
use std::path::Path;

use futures::{StreamExt, TryStreamExt, stream};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::UploadSource;
use crate::error::Result;
use crate::target::RemotePath;
use crate::traits::{CompletedPart, ObjectStore};

/// Default part size (5 MiB)
pub const DEFAULT_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Smallest part size accepted from configuration (100 KiB)
pub const MIN_PART_SIZE: u64 = 100 * 1024;

/// Most parts a session may have
pub const MAX_PARTS: u64 = 10_000;

/// Default number of parts uploaded concurrently
pub const DEFAULT_PARALLEL: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultipartSettings {
    pub part_size: u64,
    pub parallel: usize,
}

impl Default for MultipartSettings {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            parallel: DEFAULT_PARALLEL,
        }
    }
}

/// Byte range of one part in the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    pub part_number: i32,
    pub offset: u64,
    pub len: u64,
}

/// Split `size` bytes into parts of `part_size`.
///
/// The part size grows when the file would need more than [`MAX_PARTS`]
/// parts. An empty file is a single empty part.
pub fn plan_parts(size: u64, part_size: u64) -> Vec<PartRange> {
    if size == 0 {
        return vec![PartRange {
            part_number: 1,
            offset: 0,
            len: 0,
        }];
    }

    let part_size = part_size.max(1).max(size.div_ceil(MAX_PARTS));
    (0..size.div_ceil(part_size))
        .map(|i| {
            let offset = i * part_size;
            PartRange {
                part_number: i as i32 + 1,
                offset,
                len: part_size.min(size - offset),
            }
        })
        .collect()
}

/// Upload `source` as a multipart session, returning the bytes uploaded.
///
/// Up to `settings.parallel` parts are in flight at once. The first failing
/// part stops the rest and the session is aborted before the error is
/// returned, so no object appears under `path`.
pub async fn upload_multipart(
    store: &dyn ObjectStore,
    source: &UploadSource,
    path: &RemotePath,
    settings: &MultipartSettings,
) -> Result<u64> {
    let ranges = plan_parts(source.size, settings.part_size);
    let upload_id = store.create_multipart_upload(path).await?;
    tracing::debug!(object = %path, upload_id = %upload_id, parts = ranges.len(), "Multipart upload started");

    let uploaded: Result<Vec<CompletedPart>> = stream::iter(ranges)
        .map(|range| upload_range(store, path, &upload_id, &source.path, range))
        .buffer_unordered(settings.parallel.max(1))
        .try_collect()
        .await;

    let mut parts = match uploaded {
        Ok(parts) => parts,
        Err(e) => {
            abort(store, path, &upload_id).await;
            return Err(e);
        }
    };

    parts.sort_by_key(|p| p.part_number);
    let total = parts.iter().map(|p| p.size_bytes).sum();

    if let Err(e) = store.complete_multipart_upload(path, &upload_id, parts).await {
        abort(store, path, &upload_id).await;
        return Err(e);
    }

    Ok(total)
}

async fn upload_range(
    store: &dyn ObjectStore,
    path: &RemotePath,
    upload_id: &str,
    file: &Path,
    range: PartRange,
) -> Result<CompletedPart> {
    let mut handle = tokio::fs::File::open(file).await?;
    handle.seek(SeekFrom::Start(range.offset)).await?;
    let mut data = vec![0u8; range.len as usize];
    handle.read_exact(&mut data).await?;

    let part = store
        .upload_part(path, upload_id, range.part_number, data)
        .await?;
    tracing::debug!(part = range.part_number, size = range.len, "Part uploaded");
    Ok(part)
}

async fn abort(store: &dyn ObjectStore, path: &RemotePath, upload_id: &str) {
    if let Err(e) = store.abort_multipart_upload(path, upload_id).await {
        tracing::warn!(object = %path, upload_id, error = %e, "Failed to abort multipart upload");
    }
}
