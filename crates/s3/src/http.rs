//! Plain HTTP downloads for URL probes

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use rcprobe_core::{Error, FetchReport, Result, UrlFetcher};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::{check_status, map_reqwest_error};

/// reqwest client used for raw signed requests and URL downloads
pub(crate) fn build_http_client(connect_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(concat!("rcprobe/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::General(format!("Failed to build HTTP client: {e}")))
}

/// Unauthenticated GET of a URL into a file
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(connect_timeout)?,
        })
    }
}

#[async_trait]
impl UrlFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, dest: &Path) -> Result<FetchReport> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_reqwest_error("GET", e))?;
        let mut response = check_status("GET", response).await?;

        let content_length = response.content_length();
        tracing::debug!(url = %url, status = %response.status(), ?content_length, "Response received");

        let mut file = tokio::fs::File::create(dest).await?;
        let mut bytes_written = 0u64;

        // A body cut short after the headers still counts as unreachable
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Reachability(format!("GET {url}: body interrupted: {e}")))?
        {
            file.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(FetchReport {
            bytes_written,
            content_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fetch_refused_is_unreachable() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        // Nothing listens on port 1
        let url = Url::parse("http://127.0.0.1:1/file.jpg").unwrap();

        let err = fetcher
            .fetch(&url, &temp_dir.path().join("file.jpg"))
            .await
            .unwrap_err();
        assert!(err.is_reachability(), "unexpected error: {err}");
    }
}
