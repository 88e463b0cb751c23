//! Probe target resolution
//!
//! A probe target is one of:
//! - an HTTP(S) URL: `http://bucket.endpoint/object`
//! - a storage path: `oss://bucket/object` (also `s3://`)
//! - bucket/object names given as separate options

use url::Url;

use crate::error::{Error, Result};

/// Accepted storage-path schemes
pub const STORAGE_SCHEMES: &[&str] = &["oss://", "s3://"];

/// A bucket and object key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    pub bucket: String,
    /// Object key, empty when only a bucket is known
    pub key: String,
}

impl RemotePath {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into().trim_start_matches('/').to_string(),
        }
    }

    /// Same bucket, different key
    pub fn with_key(&self, key: impl Into<String>) -> Self {
        Self::new(self.bucket.clone(), key)
    }

    /// Last path segment of the key
    pub fn base_name(&self) -> &str {
        base_name(&self.key)
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "oss://{}/{}", self.bucket, self.key)
    }
}

/// What the probe talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// Plain HTTP download, no credentials involved
    Url(Url),
    /// Bucket/object on the configured storage endpoint
    StoragePath(RemotePath),
}

impl ResolvedTarget {
    /// Base name of the URL path or object key
    pub fn base_name(&self) -> &str {
        match self {
            ResolvedTarget::Url(url) => base_name(url.path()),
            ResolvedTarget::StoragePath(path) => path.base_name(),
        }
    }
}

impl std::fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedTarget::Url(url) => write!(f, "{url}"),
            ResolvedTarget::StoragePath(path) => write!(f, "{path}"),
        }
    }
}

/// Bucket and object given as plain options
#[derive(Debug, Clone, Default)]
pub struct TargetFields<'a> {
    pub bucket: Option<&'a str>,
    pub object: Option<&'a str>,
}

/// Positional arguments split by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionalArgs {
    pub storage_path: Option<String>,
    pub local_path: Option<String>,
}

/// True if `s` uses a storage-path prefix
pub fn is_storage_path(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    STORAGE_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

fn is_http_like(s: &str) -> bool {
    s.get(..4)
        .map(|p| p.eq_ignore_ascii_case("http"))
        .unwrap_or(false)
}

/// Split positional arguments into at most one storage path and one local path
pub fn split_positional(args: &[String]) -> Result<PositionalArgs> {
    let mut split = PositionalArgs::default();

    for arg in args.iter().filter(|a| !a.is_empty()) {
        let slot = if is_storage_path(arg) {
            &mut split.storage_path
        } else {
            &mut split.local_path
        };
        if slot.is_some() {
            return Err(Error::Validation(format!("Unexpected extra argument: {arg}")));
        }
        *slot = Some(arg.clone());
    }

    Ok(split)
}

/// Resolve the probe target.
///
/// `raw_target` is the `--url` value, `positional` a storage path given as an
/// argument. A URL and a storage path together are rejected.
pub fn resolve(
    raw_target: Option<&str>,
    positional: Option<&str>,
    fields: &TargetFields<'_>,
) -> Result<ResolvedTarget> {
    let raw_target = raw_target.map(str::trim).filter(|s| !s.is_empty());

    if let Some(raw) = raw_target.filter(|r| is_http_like(r)) {
        if let Some(path) = positional {
            return Err(Error::Resolution(format!(
                "URL target {raw} cannot be combined with storage path {path}"
            )));
        }
        return parse_http_url(raw).map(ResolvedTarget::Url);
    }

    let storage = match (raw_target, positional) {
        (Some(raw), Some(pos)) if is_storage_path(raw) => {
            return Err(Error::Resolution(format!(
                "Two storage paths given: {raw} and {pos}"
            )));
        }
        (Some(raw), _) if is_storage_path(raw) => Some(raw),
        (Some(raw), _) => {
            return Err(Error::Resolution(format!("Unrecognized target: {raw}")));
        }
        (None, pos) => pos,
    };

    if let Some(path) = storage {
        return parse_storage_path(path).map(ResolvedTarget::StoragePath);
    }

    let bucket = fields.bucket.map(str::trim).unwrap_or_default();
    if bucket.is_empty() {
        return Err(Error::Resolution(
            "No target: give --url, a storage path or --bucket".into(),
        ));
    }
    validate_bucket(bucket)?;

    Ok(ResolvedTarget::StoragePath(RemotePath::new(
        bucket,
        fields.object.unwrap_or_default(),
    )))
}

/// Parse an HTTP(S) URL, requiring a host and a non-empty object path
pub fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::Resolution(format!("Malformed URL {raw}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Resolution(format!("Not an HTTP URL: {raw}")));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::Resolution(format!("URL has no host: {raw}")));
    }
    if url.path().trim_start_matches('/').is_empty() {
        return Err(Error::Resolution(format!("URL has no object path: {raw}")));
    }

    Ok(url)
}

/// Parse `oss://bucket[/object]`. An empty bucket is an error, an empty object is not.
pub fn parse_storage_path(raw: &str) -> Result<RemotePath> {
    let rest = STORAGE_SCHEMES
        .iter()
        .find_map(|scheme| {
            raw.get(..scheme.len())
                .filter(|p| p.eq_ignore_ascii_case(scheme))
                .map(|_| &raw[scheme.len()..])
        })
        .ok_or_else(|| Error::Resolution(format!("Not a storage path: {raw}")))?;

    let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err(Error::Resolution(format!("Missing bucket name in {raw}")));
    }
    validate_bucket(bucket)?;

    Ok(RemotePath::new(bucket, key))
}

fn validate_bucket(bucket: &str) -> Result<()> {
    if bucket.contains(|c: char| c.is_whitespace() || c == '\\') {
        return Err(Error::Resolution(format!("Invalid bucket name: {bucket}")));
    }
    Ok(())
}

/// Last `/`-separated segment of a path, empty for paths ending in `/`
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}
