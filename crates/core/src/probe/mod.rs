//! Probe orchestrator
//!
//! Drives one probe through `Init → Validated → Resolved → Executing →
//! {Succeeded, Failed}`:
//!
//! 1. validate flags (direction, upload mode, positional arguments)
//! 2. resolve the target and assemble credentials; the download destination
//!    is fixed here, before any network I/O
//! 3. run the transfer against the primary address, and once more against
//!    the fallback address if the first attempt never got an HTTP response
//!
//! The log file is created before validation and closed before returning,
//! whatever the outcome.

mod state;


use std::path::{Path, PathBuf};

use jiff::Timestamp;
use url::Url;

use crate::address::{Address, AddressPolicy};
use crate::credentials::{StorageCredentials, assemble};
use crate::error::{Error, Result};
use crate::log::{ProbeLog, log_file_name};
use crate::target::{
    PositionalArgs, RemotePath, ResolvedTarget, TargetFields, base_name, resolve, split_positional,
};
use crate::traits::{ObjectStore, StoreConnector, UrlFetcher};
use crate::transfer::{
    Direction, TransferSummary, UploadMode, UploadSource, download_file_path, download_object,
    download_url, upload,
};

pub use state::{
    Diagnosis, ProbeConfig, ProbeError, ProbeOptions, ProbeReport, ProbeRunState, ProbeState,
    Stage,
};

/// Size of the payload written when the probe has to make up its own data
pub const PROBE_PAYLOAD_SIZE: usize = 10 * 1024;

/// Deterministic probe payload
pub fn probe_payload() -> Vec<u8> {
    const LINE: &[u8] = b"rcprobe connectivity probe payload\n";
    LINE.iter().copied().cycle().take(PROBE_PAYLOAD_SIZE).collect()
}

fn stamp(ts: Timestamp) -> String {
    ts.strftime("%Y%m%d%H%M%S").to_string()
}

/// Outcome of validation
#[derive(Debug)]
struct Validated {
    direction: Direction,
    mode: UploadMode,
    positional: PositionalArgs,
}

/// Where the upload bytes come from
#[derive(Debug, Clone)]
enum UploadInput {
    File(PathBuf),
    /// Write [`probe_payload`] to this path first
    Generated(PathBuf),
}

impl UploadInput {
    fn file_name(&self) -> String {
        let (UploadInput::File(path) | UploadInput::Generated(path)) = self;
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A fully resolved transfer
#[derive(Debug)]
enum Plan {
    UrlDownload {
        url: Url,
        dest: PathBuf,
    },
    ObjectDownload {
        path: RemotePath,
        dest: PathBuf,
        /// Upload a probe object first, download it, then delete it
        seed: bool,
        credentials: StorageCredentials,
    },
    Upload {
        path: RemotePath,
        mode: UploadMode,
        input: UploadInput,
        credentials: StorageCredentials,
    },
}

/// Runs probes with a fixed configuration and collaborators
pub struct Prober<C, F> {
    config: ProbeConfig,
    policy: AddressPolicy,
    connector: C,
    fetcher: F,
}

impl<C: StoreConnector, F: UrlFetcher> Prober<C, F> {
    pub fn new(config: ProbeConfig, connector: C, fetcher: F) -> Self {
        let policy = AddressPolicy::new(config.fallback_address.clone());
        Self {
            config,
            policy,
            connector,
            fetcher,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Run one probe. Never panics on probe failures; they end up in the report.
    pub async fn run(&self, options: &ProbeOptions) -> ProbeReport {
        let output_dir = self.config.output_dir();
        let log_path = output_dir.join(log_file_name(options.started_at));
        let mut run = ProbeRunState::new(log_path.clone());

        let mut log = match ProbeLog::create(&log_path) {
            Ok(log) => log,
            Err(e) => {
                run.state = ProbeState::Failed;
                let outcome = Err(run.fail(e));
                return ProbeReport { run, outcome };
            }
        };
        log.info(format!("Probe started at {}", options.started_at));

        let outcome = self.drive(options, &output_dir, &mut run, &mut log).await;

        match &outcome {
            Ok(summary) => {
                run.state = ProbeState::Succeeded;
                log.info(format!(
                    "Probe succeeded: {} transferred {} bytes in {} attempt(s)",
                    summary.strategy, summary.bytes_transferred, run.attempt_count
                ));
            }
            Err(e) => {
                run.state = ProbeState::Failed;
                log.error(format!("Probe failed: {e}"));
            }
        }
        if let Some(diagnosis) = run.diagnosis {
            log.info(format!("Diagnosis: {diagnosis}"));
        }

        if let Err(e) = log.close() {
            tracing::warn!(path = %log_path.display(), error = %e, "Failed to close probe log");
        }

        ProbeReport { run, outcome }
    }

    async fn drive(
        &self,
        options: &ProbeOptions,
        output_dir: &Path,
        run: &mut ProbeRunState,
        log: &mut ProbeLog,
    ) -> std::result::Result<TransferSummary, ProbeError> {
        let validated = validate(options).map_err(|e| run.fail(e))?;
        run.direction = Some(validated.direction);
        transition(run, log, ProbeState::Validated);

        let (plan, primary) = self
            .resolve(options, &validated, output_dir, run)
            .map_err(|e| run.fail(e))?;
        transition(run, log, ProbeState::Resolved);

        self.execute(&plan, primary, run, log).await
    }

    /// `Validated → Resolved`: target, destination path, credentials, primary address
    fn resolve(
        &self,
        options: &ProbeOptions,
        validated: &Validated,
        output_dir: &Path,
        run: &mut ProbeRunState,
    ) -> Result<(Plan, Address)> {
        let fields = TargetFields {
            bucket: options.bucket.as_deref(),
            object: options.object.as_deref(),
        };
        let target = resolve(
            options.url.as_deref(),
            validated.positional.storage_path.as_deref(),
            &fields,
        )?;
        let local_path = validated.positional.local_path.as_deref();
        let ts = stamp(options.started_at);

        let path = match target {
            ResolvedTarget::Url(url) => {
                if validated.direction == Direction::Upload {
                    return Err(Error::Validation("URL targets only support --download".into()));
                }
                let dest = download_file_path(local_path, base_name(url.path()), output_dir);
                run.download_file_path = Some(dest.clone());
                let primary = Address::from_url(&url)?;
                run.target = Some(ResolvedTarget::Url(url.clone()));
                return Ok((Plan::UrlDownload { url, dest }, primary));
            }
            ResolvedTarget::StoragePath(path) => path,
        };

        match validated.direction {
            Direction::Download => {
                let seed = path.key.is_empty();
                let path = if seed {
                    path.with_key(format!("rcprobe-seed-{ts}"))
                } else {
                    path
                };
                let dest = download_file_path(local_path, path.base_name(), output_dir);
                run.download_file_path = Some(dest.clone());
                run.target = Some(ResolvedTarget::StoragePath(path.clone()));

                let credentials = self.storage_credentials(&path.bucket)?;
                let primary = self.policy.primary_address(&credentials.endpoint)?;
                let plan = Plan::ObjectDownload {
                    path,
                    dest,
                    seed,
                    credentials,
                };
                Ok((plan, primary))
            }
            Direction::Upload => {
                let input = match local_path {
                    Some(file) => UploadInput::File(PathBuf::from(file)),
                    None => {
                        UploadInput::Generated(output_dir.join(format!("rcprobe-upload-{ts}.txt")))
                    }
                };
                let path = if path.key.is_empty() {
                    path.with_key(format!("rcprobe-{ts}-{}", input.file_name()))
                } else {
                    path
                };
                run.target = Some(ResolvedTarget::StoragePath(path.clone()));

                let credentials = self.storage_credentials(&path.bucket)?;
                let primary = self.policy.primary_address(&credentials.endpoint)?;
                let plan = Plan::Upload {
                    path,
                    mode: validated.mode,
                    input,
                    credentials,
                };
                Ok((plan, primary))
            }
        }
    }

    /// Credentials for `bucket`. A `[Bucket-Endpoint]` entry replaces the
    /// configured endpoint but never one given on the command line.
    fn storage_credentials(&self, bucket: &str) -> Result<StorageCredentials> {
        let mut credentials = assemble(&self.config.config, &self.config.overrides);
        let cli_endpoint = self
            .config
            .overrides
            .endpoint
            .as_deref()
            .is_some_and(|e| !e.trim().is_empty());
        if !cli_endpoint {
            if let Some(endpoint) = self.config.config.bucket_endpoint(bucket) {
                tracing::debug!(bucket, endpoint, "Using bucket endpoint");
                credentials.endpoint = Some(endpoint.to_string());
            }
        }
        credentials.require()
    }

    /// `Resolved → Executing → {Succeeded, Failed}`
    async fn execute(
        &self,
        plan: &Plan,
        primary: Address,
        run: &mut ProbeRunState,
        log: &mut ProbeLog,
    ) -> std::result::Result<TransferSummary, ProbeError> {
        let source = prepare_source(plan).map_err(|e| run.fail(e))?;
        if let Some(source) = &source {
            run.upload_file_path = Some(source.path.clone());
            log.info(format!(
                "Upload source {} ({} bytes)",
                source.path.display(),
                source.size
            ));
        }
        if let Some(dest) = &run.download_file_path {
            log.info(format!("Download destination {}", dest.display()));
        }
        transition(run, log, ProbeState::Executing);

        run.resolved_address = Some(primary.clone());
        run.attempt_count = 1;
        log.info(format!("Attempt 1: dialing {primary}"));

        let error = match self.attempt(plan, source.as_ref(), &primary, log).await {
            Ok(summary) => return Ok(summary),
            Err(e) if !e.is_reachability() => return Err(run.fail(e)),
            Err(e) => e,
        };
        log.warn(format!("Attempt 1 could not reach {primary}: {error}"));

        let fallback = self
            .policy
            .fallback_address(&primary)
            .map_err(|e| run.fail(e))?;
        run.resolved_address = Some(fallback.clone());
        run.attempt_count = 2;
        log.info(format!("Attempt 2: dialing fallback address {fallback}"));

        match self.attempt(plan, source.as_ref(), &fallback, log).await {
            Ok(summary) => {
                run.diagnosis = Some(Diagnosis::EndpointUnreachable);
                Ok(summary)
            }
            Err(e) => {
                run.diagnosis = Some(if e.is_reachability() {
                    Diagnosis::NetworkUnreachable
                } else {
                    Diagnosis::EndpointUnreachable
                });
                Err(run.fail(e))
            }
        }
    }

    /// One transfer against `address`, checked for integrity
    async fn attempt(
        &self,
        plan: &Plan,
        source: Option<&UploadSource>,
        address: &Address,
        log: &mut ProbeLog,
    ) -> Result<TransferSummary> {
        let summary = match plan {
            Plan::UrlDownload { url, dest } => {
                let url = self.policy.rebase_url(url, address)?;
                log.info(format!("GET {url}"));
                download_url(&self.fetcher, &url, dest).await?
            }
            Plan::ObjectDownload {
                path,
                dest,
                seed,
                credentials,
            } => {
                let store = self.connector.connect(address, credentials).await?;
                if *seed {
                    log.info(format!("Seeding probe object {path}"));
                    store.put_object(path, probe_payload(), Some("text/plain")).await?;
                }
                log.info(format!("Downloading {path}"));
                let result = download_object(store.as_ref(), path, dest).await;
                if *seed {
                    remove_seed(store.as_ref(), path, log).await;
                }
                result?
            }
            Plan::Upload {
                path,
                mode,
                credentials,
                ..
            } => {
                let source = source.ok_or_else(|| Error::General("upload source not prepared".into()))?;
                let store = self.connector.connect(address, credentials).await?;
                log.info(format!("Uploading {} to {path} ({mode})", source.path.display()));
                upload(store.as_ref(), *mode, source, path, &self.config.multipart).await?
            }
        };

        summary.verify()?;
        Ok(summary)
    }
}

fn validate(options: &ProbeOptions) -> Result<Validated> {
    let direction = Direction::from_flags(options.download, options.upload)?;
    let mode = UploadMode::parse(options.up_mode.as_deref())?;
    let positional = split_positional(&options.args)?;

    if direction == Direction::Upload && options.url.as_deref().is_some_and(|u| !u.trim().is_empty()) {
        return Err(Error::Validation("--url cannot be used with --upload".into()));
    }

    Ok(Validated {
        direction,
        mode,
        positional,
    })
}

fn transition(run: &mut ProbeRunState, log: &mut ProbeLog, next: ProbeState) {
    log.info(format!("State {} -> {next}", run.state));
    run.state = next;
}

/// Check the upload source, writing the generated payload if needed
fn prepare_source(plan: &Plan) -> Result<Option<UploadSource>> {
    let Plan::Upload { input, .. } = plan else {
        return Ok(None);
    };

    let path = match input {
        UploadInput::File(path) => path,
        UploadInput::Generated(path) => {
            crate::transfer::prepare_destination(path)?;
            std::fs::write(path, probe_payload())?;
            path
        }
    };
    UploadSource::open(path).map(Some)
}

async fn remove_seed(store: &dyn ObjectStore, path: &RemotePath, log: &mut ProbeLog) {
    if let Err(e) = store.delete_object(path).await {
        log.warn(format!("Failed to delete probe object {path}: {e}"));
    }
}
