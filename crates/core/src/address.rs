//! Address selection for probe attempts
//!
//! The first attempt dials the configured endpoint (or the URL host). When it
//! fails before any HTTP response arrives, the orchestrator makes one more
//! attempt against a well-known public host. Whether that host answers tells
//! a local network problem apart from a problem with the storage endpoint.

use url::Url;

use crate::error::{Error, Result};

/// Public host dialed on the fallback attempt unless configured otherwise
pub const DEFAULT_FALLBACK_ADDRESS: &str = "www.aliyun.com";

const DEFAULT_SCHEME: &str = "http";

/// A dialable network address: scheme plus host and optional port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub scheme: String,
    /// Host, including `:port` when one was given
    pub authority: String,
}

impl Address {
    /// Parse `scheme://host[:port]` or a bare `host[:port]` (defaults to http)
    pub fn parse(endpoint: &str) -> Result<Self> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        let (scheme, rest) = match endpoint.split_once("://") {
            Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
            None => (DEFAULT_SCHEME.to_string(), endpoint),
        };

        if !matches!(scheme.as_str(), "http" | "https") {
            return Err(Error::Validation(format!(
                "Unsupported endpoint scheme '{scheme}' in {endpoint}"
            )));
        }
        if rest.is_empty() || rest.contains('/') {
            return Err(Error::Validation(format!("Invalid endpoint: {endpoint}")));
        }

        Ok(Self {
            scheme,
            authority: rest.to_string(),
        })
    }

    /// Address of the host a URL points at
    pub fn from_url(url: &Url) -> Result<Self> {
        let host = url
            .host_str()
            .ok_or_else(|| Error::Resolution(format!("URL has no host: {url}")))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Self {
            scheme: url.scheme().to_string(),
            authority,
        })
    }

    /// Endpoint URL for an SDK client
    pub fn endpoint_url(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }

    /// Host without the port
    pub fn host(&self) -> &str {
        self.authority
            .rsplit_once(':')
            .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
            .map(|(host, _)| host)
            .unwrap_or(&self.authority)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.endpoint_url())
    }
}

/// Stateless policy choosing the primary and fallback addresses
#[derive(Debug, Clone)]
pub struct AddressPolicy {
    fallback: String,
}

impl AddressPolicy {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }

    /// Address derived from the configured endpoint
    pub fn primary_address(&self, endpoint: &str) -> Result<Address> {
        Address::parse(endpoint)
    }

    /// The fallback host, keeping the primary's scheme
    pub fn fallback_address(&self, primary: &Address) -> Result<Address> {
        let mut fallback = Address::parse(&self.fallback)?;
        if !self.fallback.contains("://") {
            fallback.scheme = primary.scheme.clone();
        }
        Ok(fallback)
    }

    /// `url` with its host and port replaced by `address`
    pub fn rebase_url(&self, url: &Url, address: &Address) -> Result<Url> {
        let mut rebased = url.clone();
        let invalid = |_| Error::Validation(format!("Cannot dial {address} for {url}"));

        rebased.set_scheme(&address.scheme).map_err(invalid)?;
        rebased
            .set_host(Some(address.host()))
            .map_err(|e| Error::Validation(format!("Invalid fallback host {address}: {e}")))?;
        let port = address
            .authority
            .strip_prefix(address.host())
            .and_then(|p| p.strip_prefix(':'))
            .and_then(|p| p.parse::<u16>().ok());
        rebased.set_port(port).map_err(invalid)?;
        Ok(rebased)
    }
}

impl Default for AddressPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_ADDRESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint() {
        let addr = Address::parse("oss-cn-hangzhou.aliyuncs.com").unwrap();
        assert_eq!(addr.scheme, "http");
        assert_eq!(addr.authority, "oss-cn-hangzhou.aliyuncs.com");

        let addr = Address::parse("https://localhost:9000/").unwrap();
        assert_eq!(addr.scheme, "https");
        assert_eq!(addr.authority, "localhost:9000");
        assert_eq!(addr.host(), "localhost");
        assert_eq!(addr.endpoint_url(), "https://localhost:9000");
    }

    #[test]
    fn test_parse_invalid_endpoint() {
        assert!(Address::parse("").is_err());
        assert!(Address::parse("ftp://host").is_err());
        assert!(Address::parse("http://host/path").is_err());
    }

    #[test]
    fn test_fallback_keeps_scheme() {
        let policy = AddressPolicy::default();
        let primary = policy.primary_address("https://s3.example.com").unwrap();
        let fallback = policy.fallback_address(&primary).unwrap();
        assert_eq!(fallback.endpoint_url(), "https://www.aliyun.com");

        let policy = AddressPolicy::new("http://127.0.0.1:8080");
        let fallback = policy.fallback_address(&primary).unwrap();
        assert_eq!(fallback.endpoint_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_rebase_url() {
        let policy = AddressPolicy::new("127.0.0.1:8080");
        let url = Url::parse("http://bucket.example.com/dir/file.jpg?x=1").unwrap();
        let primary = Address::from_url(&url).unwrap();
        assert_eq!(primary.authority, "bucket.example.com");

        let fallback = policy.fallback_address(&primary).unwrap();
        let rebased = policy.rebase_url(&url, &fallback).unwrap();
        assert_eq!(rebased.as_str(), "http://127.0.0.1:8080/dir/file.jpg?x=1");
    }

    #[test]
    fn test_address_from_url_with_port() {
        let url = Url::parse("https://host:9443/obj").unwrap();
        let addr = Address::from_url(&url).unwrap();
        assert_eq!(addr.endpoint_url(), "https://host:9443");
    }
}
