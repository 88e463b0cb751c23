//! probe command - Diagnose connectivity to an object storage endpoint
//!
//! Runs one download or upload against the endpoint. When the endpoint cannot
//! be reached at all, one more attempt against a well-known host tells a
//! storage-side problem from a local network problem.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use jiff::Timestamp;
use rcprobe_core::transfer::{DEFAULT_PARALLEL, DEFAULT_PART_SIZE, MIN_PART_SIZE};
use rcprobe_core::{
    ConfigMap, CredentialOverrides, DEFAULT_FALLBACK_ADDRESS, Diagnosis, Direction,
    MultipartSettings, ProbeConfig, ProbeOptions, ProbeReport, ProbeState, Prober, Stage,
    Strategy, load_config,
};
use rcprobe_core::log::write_failure_log;
use rcprobe_s3::{ClientOptions, DEFAULT_CONNECT_TIMEOUT, HttpFetcher, S3Connector};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Probe an endpoint with one download or upload
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Probe with a download
    #[arg(long)]
    pub download: bool,

    /// Probe with an upload
    #[arg(long)]
    pub upload: bool,

    /// Download this HTTP(S) URL instead of a bucket object
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Upload mode: normal, append or multipart
    #[arg(long = "upmode", value_name = "MODE")]
    pub up_mode: Option<String>,

    /// Bucket name, when no storage path is given
    #[arg(long)]
    pub bucket: Option<String>,

    /// Object name inside --bucket
    #[arg(long)]
    pub object: Option<String>,

    /// Host dialed once when the endpoint is unreachable
    #[arg(long, value_name = "HOST", default_value = DEFAULT_FALLBACK_ADDRESS)]
    pub addr: String,

    /// Config file [default: ~/.rcprobe/config.toml]
    #[arg(long, value_name = "PATH", env = "RCPROBE_CONFIG")]
    pub config_file: Option<String>,

    /// Storage endpoint, e.g. https://oss-cn-hangzhou.aliyuncs.com
    #[arg(short = 'e', long)]
    pub endpoint: Option<String>,

    #[arg(short = 'i', long)]
    pub access_key_id: Option<String>,

    #[arg(short = 'k', long)]
    pub access_key_secret: Option<String>,

    /// Session token for temporary credentials
    #[arg(short = 't', long)]
    pub sts_token: Option<String>,

    /// Signing region
    #[arg(long)]
    pub region: Option<String>,

    /// Directory for the log and generated files [default: outputDir from config, then .]
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Multipart part size in bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_PART_SIZE, value_parser = parse_part_size)]
    pub part_size: u64,

    /// Parts uploaded concurrently in multipart mode
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PARALLEL, value_parser = parse_parallel)]
    pub parallel: usize,

    /// Connect timeout in seconds
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_CONNECT_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub connect_timeout: u64,

    /// Local file or directory, and/or a storage path (oss://bucket/object)
    #[arg(value_name = "PATH")]
    pub args: Vec<String>,
}

fn parse_part_size(value: &str) -> Result<u64, String> {
    let size: u64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a byte count"))?;
    if size < MIN_PART_SIZE {
        return Err(format!("part size must be at least {MIN_PART_SIZE} bytes"));
    }
    Ok(size)
}

fn parse_parallel(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("'{value}' is not a positive number")),
    }
}

/// Result of a probe, as printed
#[derive(Debug, Serialize)]
struct ProbeSummary {
    status: &'static str,
    state: ProbeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy: Option<Strategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes_transferred: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_human: Option<String>,
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnosis: Option<Diagnosis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    log_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upload_file: Option<String>,
}

impl ProbeSummary {
    fn from_report(report: &ProbeReport, elapsed: Duration) -> Self {
        let run = &report.run;
        let (summary, error) = match &report.outcome {
            Ok(summary) => (Some(summary), None),
            Err(e) => (None, Some(e)),
        };

        Self {
            status: if report.is_success() {
                "succeeded"
            } else {
                "failed"
            },
            state: run.state,
            direction: run.direction,
            target: run.target.as_ref().map(ToString::to_string),
            address: run.resolved_address.as_ref().map(ToString::to_string),
            attempts: run.attempt_count,
            strategy: summary.map(|s| s.strategy),
            bytes_transferred: summary.map(|s| s.bytes_transferred),
            size_human: summary.map(|s| format_size(s.bytes_transferred)),
            elapsed_ms: elapsed.as_millis() as u64,
            diagnosis: run.diagnosis,
            stage: error.map(|e| e.stage),
            error: error.map(ToString::to_string),
            log_file: run.log_path.display().to_string(),
            download_file: run.download_file_path.as_ref().map(|p| p.display().to_string()),
            upload_file: run.upload_file_path.as_ref().map(|p| p.display().to_string()),
        }
    }
}

/// Execute the probe command
pub async fn execute(args: ProbeArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let config = match load_config(args.config_file.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            let output_dir = args.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
            match write_failure_log(&output_dir, Timestamp::now(), &e) {
                Ok(path) => tracing::debug!(path = %path.display(), "Wrote probe log"),
                Err(log_err) => {
                    tracing::warn!(dir = %output_dir.display(), error = %log_err, "Failed to write probe log")
                }
            }
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    let client_options = ClientOptions {
        connect_timeout: Duration::from_secs(args.connect_timeout),
    };
    let connector = match S3Connector::new(client_options.clone()) {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("Failed to create storage client: {e}"));
            return ExitCode::GeneralError;
        }
    };
    let fetcher = match HttpFetcher::new(client_options.connect_timeout) {
        Ok(f) => f,
        Err(e) => {
            formatter.error(&format!("Failed to create HTTP client: {e}"));
            return ExitCode::GeneralError;
        }
    };

    let prober = Prober::new(build_probe_config(&args, config), connector, fetcher);
    let options = build_options(args, Timestamp::now());

    let spinner = start_spinner(&formatter);
    let started = Instant::now();
    let report = prober.run(&options).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let summary = ProbeSummary::from_report(&report, started.elapsed());
    if formatter.is_json() {
        formatter.json(&summary);
    } else {
        print_human(&formatter, &summary);
    }

    match &report.outcome {
        Ok(_) => ExitCode::Success,
        Err(e) => ExitCode::from_error(&e.source),
    }
}

fn build_probe_config(args: &ProbeArgs, config: ConfigMap) -> ProbeConfig {
    let mut probe_config = ProbeConfig::new(config);
    probe_config.overrides = CredentialOverrides {
        endpoint: args.endpoint.clone(),
        access_key_id: args.access_key_id.clone(),
        access_key_secret: args.access_key_secret.clone(),
        sts_token: args.sts_token.clone(),
        region: args.region.clone(),
    };
    probe_config.output_dir = args.output_dir.clone();
    if !args.addr.trim().is_empty() {
        probe_config.fallback_address = args.addr.trim().to_string();
    }
    probe_config.multipart = MultipartSettings {
        part_size: args.part_size,
        parallel: args.parallel,
    };
    probe_config
}

fn build_options(args: ProbeArgs, started_at: Timestamp) -> ProbeOptions {
    let mut options = ProbeOptions::new(started_at);
    options.download = args.download;
    options.upload = args.upload;
    options.url = args.url;
    options.bucket = args.bucket;
    options.object = args.object;
    options.args = args.args;
    options.up_mode = args.up_mode;
    options
}

fn start_spinner(formatter: &Formatter) -> Option<ProgressBar> {
    if formatter.is_json() || formatter.is_quiet() || !console::Term::stderr().is_term() {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    let template = if formatter.colors_enabled() {
        "{spinner:.green} {msg} {elapsed}"
    } else {
        "{spinner} {msg} {elapsed}"
    };
    if let Ok(style) = ProgressStyle::default_spinner().template(template) {
        pb.set_style(style);
    }
    pb.set_message("Probing");
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn print_human(formatter: &Formatter, summary: &ProbeSummary) {
    match &summary.error {
        None => {
            let direction = summary
                .direction
                .map(|d| d.to_string())
                .unwrap_or_default();
            formatter.success(&format!("Probe succeeded ({direction})"));
        }
        Some(error) => formatter.error(&format!("Probe failed: {error}")),
    }

    if let Some(target) = &summary.target {
        formatter.field("Target", &formatter.style_url(target));
    }
    if let Some(address) = &summary.address {
        formatter.field("Address", &formatter.style_url(address));
    }
    formatter.field("Attempts", &summary.attempts.to_string());
    if let (Some(bytes), Some(human)) = (summary.bytes_transferred, &summary.size_human) {
        let strategy = summary.strategy.map(|s| s.to_string()).unwrap_or_default();
        formatter.field(
            "Moved",
            &format!("{} ({bytes} bytes, {strategy})", formatter.style_size(human)),
        );
    }
    formatter.field(
        "Elapsed",
        &format!("{:.2}s", summary.elapsed_ms as f64 / 1000.0),
    );
    formatter.field("Log", &formatter.style_path(&summary.log_file));
    if let Some(path) = &summary.download_file {
        formatter.field("Download", &formatter.style_path(path));
    }
    if let Some(path) = &summary.upload_file {
        formatter.field("Upload", &formatter.style_path(path));
    }

    if let Some(diagnosis) = summary.diagnosis {
        formatter.warning(&format!("Diagnosis: {diagnosis}"));
    }
}

fn format_size(size: u64) -> String {
    humansize::format_size(size, humansize::BINARY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;
    use rcprobe_core::{
        Address, Error, ProbeError, ProbeRunState, RemotePath, ResolvedTarget, TransferSummary,
    };

    fn parse(args: &[&str]) -> ProbeArgs {
        let cli = Cli::try_parse_from(std::iter::once("rcprobe").chain(args.iter().copied()))
            .expect("arguments should parse");
        match cli.command {
            Commands::Probe(args) => args,
        }
    }

    fn run_state() -> ProbeRunState {
        ProbeRunState {
            state: ProbeState::Succeeded,
            direction: Some(Direction::Download),
            target: Some(ResolvedTarget::StoragePath(RemotePath::new("bucket", "a.txt"))),
            resolved_address: Some(Address::parse("oss.example.com").unwrap()),
            download_file_path: Some(PathBuf::from("out/a.txt")),
            upload_file_path: None,
            log_path: PathBuf::from("out/rcprobe-20240501102030.log"),
            attempt_count: 1,
            diagnosis: None,
        }
    }

    #[test]
    fn test_parse_probe_args() {
        let args = parse(&[
            "probe",
            "--download",
            "-e",
            "oss.example.com",
            "-i",
            "id",
            "-k",
            "secret",
            "oss://bucket/file.jpg",
            "./out/",
        ]);

        assert!(args.download);
        assert!(!args.upload);
        assert_eq!(args.endpoint.as_deref(), Some("oss.example.com"));
        assert_eq!(args.args, vec!["oss://bucket/file.jpg", "./out/"]);
        assert_eq!(args.addr, DEFAULT_FALLBACK_ADDRESS);
        assert_eq!(args.part_size, DEFAULT_PART_SIZE);
        assert_eq!(args.parallel, DEFAULT_PARALLEL);
        assert_eq!(args.connect_timeout, 10);
    }

    #[test]
    fn test_parse_rejects_small_part_size() {
        let result = Cli::try_parse_from(["rcprobe", "probe", "--upload", "--part-size", "1024"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["rcprobe", "probe", "--upload", "--parallel", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_build_probe_config() {
        let args = parse(&[
            "probe",
            "--upload",
            "--addr",
            "probe.example.net",
            "--output-dir",
            "/tmp/probe",
            "--part-size",
            "204800",
            "--parallel",
            "8",
            "-t",
            "",
        ]);
        let config = build_probe_config(&args, ConfigMap::new());

        assert_eq!(config.fallback_address, "probe.example.net");
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/probe"));
        assert_eq!(config.multipart.part_size, 204800);
        assert_eq!(config.multipart.parallel, 8);
        assert_eq!(config.overrides.sts_token.as_deref(), Some(""));
    }

    #[test]
    fn test_build_options() {
        let args = parse(&[
            "probe",
            "--upload",
            "--upmode",
            "multipart",
            "--bucket",
            "b",
            "local.bin",
        ]);
        let started_at = Timestamp::UNIX_EPOCH;
        let options = build_options(args, started_at);

        assert!(options.upload);
        assert_eq!(options.up_mode.as_deref(), Some("multipart"));
        assert_eq!(options.bucket.as_deref(), Some("b"));
        assert_eq!(options.args, vec!["local.bin"]);
        assert_eq!(options.started_at, started_at);
    }

    #[test]
    fn test_summary_success() {
        let report = ProbeReport {
            run: run_state(),
            outcome: Ok(TransferSummary {
                strategy: Strategy::Download,
                bytes_transferred: 2048,
                expected_bytes: Some(2048),
            }),
        };

        let summary = ProbeSummary::from_report(&report, Duration::from_millis(1500));
        assert_eq!(summary.status, "succeeded");
        assert_eq!(summary.target.as_deref(), Some("oss://bucket/a.txt"));
        assert_eq!(summary.address.as_deref(), Some("http://oss.example.com"));
        assert_eq!(summary.size_human.as_deref(), Some("2 KiB"));
        assert_eq!(summary.elapsed_ms, 1500);
        assert!(summary.error.is_none());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["state"], "succeeded");
        assert_eq!(json["direction"], "download");
        assert_eq!(json["strategy"], "download");
        assert!(json.get("stage").is_none());
    }

    #[test]
    fn test_summary_failure() {
        let mut run = run_state();
        run.state = ProbeState::Failed;
        run.attempt_count = 2;
        run.diagnosis = Some(Diagnosis::NetworkUnreachable);
        let report = ProbeReport {
            outcome: Err(ProbeError {
                stage: Stage::Execution,
                attempt: 2,
                address: None,
                source: Error::Reachability("connection refused".into()),
            }),
            run,
        };

        let summary = ProbeSummary::from_report(&report, Duration::ZERO);
        assert_eq!(summary.status, "failed");
        assert_eq!(summary.stage, Some(Stage::Execution));
        assert!(summary.bytes_transferred.is_none());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["diagnosis"], "network_unreachable");
        assert_eq!(json["attempts"], 2);
        assert_eq!(
            json["error"],
            "execution failed on attempt 2: Network unreachable: connection refused"
        );
    }
}
