use std::path::Path;

use url::Url;

use super::{Strategy, TransferSummary, prepare_destination};
use crate::error::Result;
use crate::target::RemotePath;
use crate::traits::{ObjectStore, UrlFetcher};

/// Download an object to `dest`, expecting the size reported by HEAD
pub async fn download_object(
    store: &dyn ObjectStore,
    path: &RemotePath,
    dest: &Path,
) -> Result<TransferSummary> {
    prepare_destination(dest)?;

    let info = store.head_object(path).await?;
    tracing::debug!(object = %path, size = info.size_bytes, "Remote object found");

    let written = store.download_object(path, dest).await?;

    Ok(TransferSummary {
        strategy: Strategy::Download,
        bytes_transferred: written,
        expected_bytes: Some(info.size_bytes),
    })
}

/// Download a URL to `dest`, expecting Content-Length when the server sends one
pub async fn download_url(
    fetcher: &dyn UrlFetcher,
    url: &Url,
    dest: &Path,
) -> Result<TransferSummary> {
    prepare_destination(dest)?;

    let report = fetcher.fetch(url, dest).await?;

    Ok(TransferSummary {
        strategy: Strategy::Download,
        bytes_transferred: report.bytes_written,
        expected_bytes: report.content_length,
    })
}
