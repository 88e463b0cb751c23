use std::time::Duration;

use async_trait::async_trait;
use rcprobe_core::{Address, ObjectStore, Result, StorageCredentials, StoreConnector};

use crate::client::S3Client;
use crate::http::build_http_client;

/// Default time allowed to establish a TCP/TLS connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport settings shared by every client a connector builds
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Builds [`S3Client`]s, one per dialed address
pub struct S3Connector {
    options: ClientOptions,
    http: reqwest::Client,
}

impl S3Connector {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let http = build_http_client(options.connect_timeout)?;
        Ok(Self { options, http })
    }
}

#[async_trait]
impl StoreConnector for S3Connector {
    async fn connect(
        &self,
        address: &Address,
        credentials: &StorageCredentials,
    ) -> Result<Box<dyn ObjectStore>> {
        tracing::debug!(address = %address, region = %credentials.region, "Creating storage client");
        let client = S3Client::new(address, credentials, &self.options, self.http.clone()).await?;
        Ok(Box::new(client))
    }
}
