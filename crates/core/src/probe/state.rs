use std::path::PathBuf;

use jiff::Timestamp;
use serde::Serialize;
use thiserror::Error;

use crate::address::{Address, DEFAULT_FALLBACK_ADDRESS};
use crate::config::{ConfigMap, option};
use crate::credentials::CredentialOverrides;
use crate::error::Error;
use crate::target::ResolvedTarget;
use crate::transfer::{Direction, MultipartSettings, TransferSummary};

/// Inputs of one probe invocation
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub download: bool,
    pub upload: bool,
    /// `--url` value
    pub url: Option<String>,
    pub bucket: Option<String>,
    pub object: Option<String>,
    /// Positional arguments: a local path and/or a storage path
    pub args: Vec<String>,
    /// Raw `--upmode` value, validated by the orchestrator
    pub up_mode: Option<String>,
    /// Names of synthesized artifacts derive from this
    pub started_at: Timestamp,
}

impl ProbeOptions {
    pub fn new(started_at: Timestamp) -> Self {
        Self {
            download: false,
            upload: false,
            url: None,
            bucket: None,
            object: None,
            args: Vec::new(),
            up_mode: None,
            started_at,
        }
    }
}

/// Orchestrator configuration, fixed for the lifetime of a [`super::Prober`]
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub config: ConfigMap,
    pub overrides: CredentialOverrides,
    /// `--output-dir`; falls back to the config's `outputDir`, then `.`
    pub output_dir: Option<PathBuf>,
    pub fallback_address: String,
    pub multipart: MultipartSettings,
}

impl ProbeConfig {
    pub fn new(config: ConfigMap) -> Self {
        Self {
            config,
            overrides: CredentialOverrides::default(),
            output_dir: None,
            fallback_address: DEFAULT_FALLBACK_ADDRESS.to_string(),
            multipart: MultipartSettings::default(),
        }
    }

    /// Directory receiving the log and synthesized files
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| self.config.get(option::OUTPUT_DIR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Orchestrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeState {
    Init,
    Validated,
    Resolved,
    Executing,
    Succeeded,
    Failed,
}

impl std::fmt::Display for ProbeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProbeState::Init => "init",
            ProbeState::Validated => "validated",
            ProbeState::Resolved => "resolved",
            ProbeState::Executing => "executing",
            ProbeState::Succeeded => "succeeded",
            ProbeState::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Phase a probe was in when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Validation,
    Resolution,
    Execution,
}

impl Stage {
    fn of(state: ProbeState) -> Self {
        match state {
            ProbeState::Init => Stage::Validation,
            ProbeState::Validated => Stage::Resolution,
            _ => Stage::Execution,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Validation => write!(f, "validation"),
            Stage::Resolution => write!(f, "resolution"),
            Stage::Execution => write!(f, "execution"),
        }
    }
}

/// What the fallback attempt revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnosis {
    /// The fallback host answered; the storage endpoint is the problem
    EndpointUnreachable,
    /// The fallback host did not answer either; the local network is the problem
    NetworkUnreachable,
}

impl std::fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnosis::EndpointUnreachable => {
                write!(f, "network is up, the storage endpoint is unreachable")
            }
            Diagnosis::NetworkUnreachable => {
                write!(f, "fallback host unreachable too, check the local network")
            }
        }
    }
}

/// Mutable state of one probe run
#[derive(Debug, Clone)]
pub struct ProbeRunState {
    pub state: ProbeState,
    pub direction: Option<Direction>,
    pub target: Option<ResolvedTarget>,
    /// Address currently dialed; replaced at most once by the fallback
    pub resolved_address: Option<Address>,
    /// Set before the download starts, kept on failure
    pub download_file_path: Option<PathBuf>,
    /// Local file uploaded by the probe
    pub upload_file_path: Option<PathBuf>,
    pub log_path: PathBuf,
    /// 0 before any transfer, 2 after the fallback attempt
    pub attempt_count: u32,
    pub diagnosis: Option<Diagnosis>,
}

impl ProbeRunState {
    pub(super) fn new(log_path: PathBuf) -> Self {
        Self {
            state: ProbeState::Init,
            direction: None,
            target: None,
            resolved_address: None,
            download_file_path: None,
            upload_file_path: None,
            log_path,
            attempt_count: 0,
            diagnosis: None,
        }
    }

    /// Wrap `source` with the current stage, attempt and address
    pub(super) fn fail(&self, source: Error) -> ProbeError {
        ProbeError {
            stage: Stage::of(self.state),
            attempt: self.attempt_count,
            address: self.resolved_address.clone(),
            source,
        }
    }
}

/// A failed probe, with where and against what it failed
#[derive(Debug, Error)]
#[error("{stage} failed{}: {source}", attempt_context(.attempt, .address))]
pub struct ProbeError {
    pub stage: Stage,
    /// 0 when no transfer was attempted
    pub attempt: u32,
    pub address: Option<Address>,
    #[source]
    pub source: Error,
}

fn attempt_context(attempt: &u32, address: &Option<Address>) -> String {
    match (*attempt, address) {
        (0, _) => String::new(),
        (n, Some(addr)) => format!(" on attempt {n} ({addr})"),
        (n, None) => format!(" on attempt {n}"),
    }
}

/// Result of [`super::Prober::run`]: final run state plus outcome
#[derive(Debug)]
pub struct ProbeReport {
    pub run: ProbeRunState,
    pub outcome: Result<TransferSummary, ProbeError>,
}

impl ProbeReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_dir_precedence() {
        let mut config = ConfigMap::new();
        let probe_config = ProbeConfig::new(config.clone());
        assert_eq!(probe_config.output_dir(), PathBuf::from("."));

        config.set(option::OUTPUT_DIR, "/var/probe");
        let mut probe_config = ProbeConfig::new(config);
        assert_eq!(probe_config.output_dir(), PathBuf::from("/var/probe"));

        probe_config.output_dir = Some(PathBuf::from("cli-out"));
        assert_eq!(probe_config.output_dir(), PathBuf::from("cli-out"));
    }

    #[test]
    fn test_probe_error_display() {
        let mut run = ProbeRunState::new(PathBuf::from("probe.log"));
        let err = run.fail(Error::Validation("bad".into()));
        assert_eq!(err.to_string(), "validation failed: Invalid arguments: bad");

        run.state = ProbeState::Executing;
        run.attempt_count = 2;
        run.resolved_address = Some(Address::parse("www.aliyun.com").unwrap());
        let err = run.fail(Error::Reachability("connection refused".into()));
        assert_eq!(
            err.to_string(),
            "execution failed on attempt 2 (http://www.aliyun.com): Network unreachable: connection refused"
        );
    }
}
