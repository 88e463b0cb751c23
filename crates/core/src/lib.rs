//! rcprobe-core: Probe engine for the rcprobe diagnostic CLI
//!
//! This crate provides everything a probe needs apart from the wire clients:
//! - Config file loading and credential assembly
//! - Target resolution (URL, storage path, bucket/object fields)
//! - Primary and fallback address selection
//! - Transfer strategies (download, normal/append/multipart upload)
//! - The probe orchestrator and its log file
//!
//! Storage and HTTP access go through the [`ObjectStore`], [`StoreConnector`]
//! and [`UrlFetcher`] traits, implemented in `rcprobe-s3`.

pub mod address;
pub mod config;
pub mod credentials;
pub mod error;
pub mod log;
pub mod probe;
pub mod target;
pub mod traits;
pub mod transfer;

pub use address::{Address, AddressPolicy, DEFAULT_FALLBACK_ADDRESS};
pub use config::{ConfigMap, load_config};
pub use credentials::{CredentialOverrides, Credentials, StorageCredentials};
pub use error::{Error, RejectionKind, Result};
pub use probe::{
    Diagnosis, ProbeConfig, ProbeError, ProbeOptions, ProbeReport, ProbeRunState, ProbeState,
    Prober, Stage,
};
pub use target::{RemotePath, ResolvedTarget};
pub use traits::{CompletedPart, FetchReport, ObjectInfo, ObjectStore, ObjectType, StoreConnector, UrlFetcher};
pub use transfer::{Direction, MultipartSettings, Strategy, TransferSummary, UploadMode};
