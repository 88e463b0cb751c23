//! Credential assembly
//!
//! Merges CLI overrides over the config map. Nothing here touches the network.

use crate::config::{ConfigMap, option};
use crate::error::{Error, Result};

/// Region used when neither the CLI nor the config file names one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Credential values passed on the command line
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    pub sts_token: Option<String>,
    pub region: Option<String>,
}

/// Credentials as assembled; any field may still be absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    pub sts_token: Option<String>,
    pub region: String,
}

/// Credentials checked to hold everything a storage transfer needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    pub endpoint: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    pub sts_token: Option<String>,
    pub region: String,
}

/// Merge CLI overrides over config values. Empty CLI strings count as unset.
pub fn assemble(config: &ConfigMap, overrides: &CredentialOverrides) -> Credentials {
    let pick = |cli: &Option<String>, name: &str| -> Option<String> {
        cli.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| config.get(name))
            .map(str::to_string)
    };

    Credentials {
        endpoint: pick(&overrides.endpoint, option::ENDPOINT),
        access_key_id: pick(&overrides.access_key_id, option::ACCESS_KEY_ID),
        access_key_secret: pick(&overrides.access_key_secret, option::ACCESS_KEY_SECRET),
        sts_token: pick(&overrides.sts_token, option::STS_TOKEN),
        region: pick(&overrides.region, option::REGION).unwrap_or_else(|| DEFAULT_REGION.into()),
    }
}

impl Credentials {
    /// Check that endpoint, access key id and secret are present.
    ///
    /// Called right before a storage transfer; the session token stays optional.
    pub fn require(&self) -> Result<StorageCredentials> {
        let missing = |name: &str| Error::MissingCredential(format!("{name} is not set"));

        Ok(StorageCredentials {
            endpoint: self.endpoint.clone().ok_or_else(|| missing("endpoint"))?,
            access_key_id: self
                .access_key_id
                .clone()
                .ok_or_else(|| missing("access key id"))?,
            access_key_secret: self
                .access_key_secret
                .clone()
                .ok_or_else(|| missing("access key secret"))?,
            sts_token: self.sts_token.clone(),
            region: self.region.clone(),
        })
    }
}
