//! Configuration file loading
//!
//! The config file is TOML. Credential options live in the `[Credentials]`
//! table and may be spelled several ways; every accepted spelling is mapped to
//! one canonical option through [`OPTION_ALIASES`]. Per-bucket endpoints live
//! in the `[Bucket-Endpoint]` table.
//!
//! ```toml
//! [Credentials]
//! endpoint = "oss-cn-hangzhou.aliyuncs.com"
//! access_key_id = "LTAI..."
//! accessKeySecret = "..."
//!
//! [Bucket-Endpoint]
//! logs-bucket = "oss-cn-shanghai.aliyuncs.com"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Table holding credential options
pub const CREDENTIALS_SECTION: &str = "Credentials";

/// Table mapping bucket names to their own endpoint
pub const BUCKET_ENDPOINT_SECTION: &str = "Bucket-Endpoint";

/// Environment variable overriding the default config file location
pub const CONFIG_ENV: &str = "RCPROBE_CONFIG";

/// Canonical option names
pub mod option {
    pub const ENDPOINT: &str = "endpoint";
    pub const ACCESS_KEY_ID: &str = "accessKeyID";
    pub const ACCESS_KEY_SECRET: &str = "accessKeySecret";
    pub const STS_TOKEN: &str = "stsToken";
    pub const OUTPUT_DIR: &str = "outputDir";
    pub const REGION: &str = "region";
    pub const LANGUAGE: &str = "language";
}

/// Canonical option name and the spellings accepted for it in a config file.
///
/// Matching is case-insensitive, so `accessKeyId` and `AccessKeyID` both hit
/// the `accessKeyID` entry.
pub const OPTION_ALIASES: &[(&str, &[&str])] = &[
    (option::ENDPOINT, &["endpoint", "host"]),
    (
        option::ACCESS_KEY_ID,
        &[
            "accessKeyID",
            "access_key_id",
            "access_id",
            "accessid",
            "access-key-id",
            "access-id",
        ],
    ),
    (
        option::ACCESS_KEY_SECRET,
        &[
            "accessKeySecret",
            "access_key_secret",
            "access_key",
            "accesskey",
            "access-key-secret",
            "access-key",
        ],
    ),
    (option::STS_TOKEN, &["stsToken", "sts_token", "sts-token"]),
    (
        option::OUTPUT_DIR,
        &["outputDir", "output-dir", "output_dir", "output_directory"],
    ),
    (option::REGION, &["region"]),
    (option::LANGUAGE, &["language"]),
];

/// Look up the canonical option name for a spelling found in a config file
pub fn canonical_option(name: &str) -> Option<&'static str> {
    let name = name.trim();
    OPTION_ALIASES
        .iter()
        .find(|(_, spellings)| spellings.iter().any(|s| s.eq_ignore_ascii_case(name)))
        .map(|(canonical, _)| *canonical)
}

/// A config value: either a plain option or a nested name → value table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Scalar(String),
    Table(BTreeMap<String, String>),
}

/// Flat option map produced from a config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMap {
    values: BTreeMap<String, ConfigValue>,
}

impl ConfigMap {
    /// Create an empty config map
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a scalar option
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(name.into(), ConfigValue::Scalar(value.into()));
    }

    /// Set a nested table
    pub fn set_table(&mut self, name: impl Into<String>, table: BTreeMap<String, String>) {
        self.values.insert(name.into(), ConfigValue::Table(table));
    }

    /// Get a scalar option, ignoring empty values
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ConfigValue::Scalar(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get an entry of a nested table
    pub fn get_in(&self, table: &str, key: &str) -> Option<&str> {
        match self.values.get(table) {
            Some(ConfigValue::Table(t)) => t.get(key).map(String::as_str),
            _ => None,
        }
    }

    /// Endpoint configured for a specific bucket, if any
    pub fn bucket_endpoint(&self, bucket: &str) -> Option<&str> {
        self.get_in(BUCKET_ENDPOINT_SECTION, bucket)
            .filter(|e| !e.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Decide which config file to read.
///
/// An explicit path wins, then `RCPROBE_CONFIG`, then `~/.rcprobe/config.toml`.
/// A leading `~/` is expanded to the home directory. The boolean is true when
/// the caller named the file, in which case it must exist.
pub fn decide_config_file(explicit: Option<&str>) -> Result<(PathBuf, bool)> {
    let (raw, explicit) = match explicit.filter(|s| !s.is_empty()) {
        Some(path) => (path.to_string(), true),
        None => match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => (path, true),
            _ => {
                let home = dirs::home_dir()
                    .ok_or_else(|| Error::Config("Cannot determine home directory".into()))?;
                return Ok((home.join(".rcprobe").join("config.toml"), false));
            }
        },
    };

    Ok((expand_home(&raw)?, explicit))
}

fn expand_home(path: &str) -> Result<PathBuf> {
    let sep = std::path::MAIN_SEPARATOR;
    match path.strip_prefix('~') {
        Some(rest) if rest.starts_with(sep) || rest.starts_with('/') => {
            let home = dirs::home_dir()
                .ok_or_else(|| Error::Config("Cannot determine home directory".into()))?;
            Ok(home.join(rest.trim_start_matches([sep, '/'])))
        }
        _ => Ok(PathBuf::from(path)),
    }
}

/// Load the config map from a file chosen by [`decide_config_file`]
pub fn load_config(explicit: Option<&str>) -> Result<ConfigMap> {
    let (path, explicit) = decide_config_file(explicit)?;

    if !path.exists() {
        if explicit {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), "No config file, using empty config");
        return Ok(ConfigMap::new());
    }

    load_config_file(&path)
}

/// Read and parse one config file
pub fn load_config_file(path: &Path) -> Result<ConfigMap> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;
    let map = parse_config(&content)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), "Loaded config file");
    Ok(map)
}

/// Parse config file content into a [`ConfigMap`]
pub fn parse_config(content: &str) -> std::result::Result<ConfigMap, String> {
    let table: toml::Table = content.parse().map_err(|e| format!("invalid TOML: {e}"))?;
    let mut map = ConfigMap::new();

    let credentials = table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(CREDENTIALS_SECTION))
        .map(|(_, value)| value)
        .ok_or_else(|| format!("missing [{CREDENTIALS_SECTION}] table"))?;
    let credentials = credentials
        .as_table()
        .ok_or_else(|| format!("[{CREDENTIALS_SECTION}] must be a table"))?;

    for (name, value) in credentials {
        let Some(canonical) = canonical_option(name) else {
            tracing::debug!(option = %name, "Ignoring unknown config option");
            continue;
        };
        map.set(canonical, scalar(value, name)?.trim());
    }

    if let Some((_, value)) = table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(BUCKET_ENDPOINT_SECTION))
    {
        let section = value
            .as_table()
            .ok_or_else(|| format!("[{BUCKET_ENDPOINT_SECTION}] must be a table"))?;
        let mut endpoints = BTreeMap::new();
        for (bucket, host) in section {
            endpoints.insert(bucket.trim().to_string(), scalar(host, bucket)?.trim().to_string());
        }
        map.set_table(BUCKET_ENDPOINT_SECTION, endpoints);
    }

    Ok(map)
}

fn scalar(value: &toml::Value, name: &str) -> std::result::Result<String, String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        _ => Err(format!("option \"{name}\" must be a string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_canonical_option_case_insensitive() {
        assert_eq!(canonical_option("accessKeyId"), Some(option::ACCESS_KEY_ID));
        assert_eq!(canonical_option("AccessKeyID"), Some(option::ACCESS_KEY_ID));
        assert_eq!(canonical_option("access-id"), Some(option::ACCESS_KEY_ID));
        assert_eq!(canonical_option(" host "), Some(option::ENDPOINT));
        assert_eq!(canonical_option("STS_TOKEN"), Some(option::STS_TOKEN));
        assert_eq!(canonical_option("access_key"), Some(option::ACCESS_KEY_SECRET));
        assert_eq!(canonical_option("Language"), Some(option::LANGUAGE));
        assert_eq!(canonical_option("lang"), None);
    }

    #[test]
    fn test_parse_config() {
        let map = parse_config(
            r#"
[Credentials]
host = " oss-cn-hangzhou.aliyuncs.com "
access_key_id = "id"
AccessKeySecret = "secret"
language = "EN"

[Bucket-Endpoint]
logs = "oss-cn-shanghai.aliyuncs.com"
"#,
        )
        .unwrap();

        assert_eq!(map.get(option::ENDPOINT), Some("oss-cn-hangzhou.aliyuncs.com"));
        assert_eq!(map.get(option::ACCESS_KEY_ID), Some("id"));
        assert_eq!(map.get(option::ACCESS_KEY_SECRET), Some("secret"));
        assert_eq!(map.get(option::STS_TOKEN), None);
        assert_eq!(map.get(option::LANGUAGE), Some("EN"));
        assert_eq!(map.bucket_endpoint("logs"), Some("oss-cn-shanghai.aliyuncs.com"));
        assert_eq!(map.bucket_endpoint("other"), None);
    }

    #[test]
    fn test_parse_config_requires_credentials_table() {
        assert!(parse_config("[Other]\nkey = \"v\"\n").is_err());
        assert!(parse_config("not toml [").is_err());
        assert!(parse_config("[Credentials]\nendpoint = [1, 2]\n").is_err());
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        let result = load_config(Some(missing.to_str().unwrap()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[credentials]\nendpoint = \"localhost:9000\"\n").unwrap();

        let map = load_config(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(map.get(option::ENDPOINT), Some("localhost:9000"));
    }

    #[test]
    fn test_expand_home() {
        let expanded = expand_home("~/cfg/config.toml").unwrap();
        assert!(expanded.ends_with("cfg/config.toml"));
        assert!(!expanded.starts_with("~"));
        assert_eq!(expand_home("./config.toml").unwrap(), PathBuf::from("./config.toml"));
    }
}
