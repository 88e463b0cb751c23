//! rcprobe-s3: S3/OSS storage adapter for rcprobe
//!
//! Implements the `rcprobe-core` client traits:
//! - [`S3Client`]: [`rcprobe_core::ObjectStore`] on top of aws-sdk-s3, with
//!   SigV4-signed raw requests for the OSS-specific HEAD and append calls
//! - [`S3Connector`]: builds an [`S3Client`] for a given address
//! - [`HttpFetcher`]: plain GET of a URL for URL probes

pub mod client;
pub mod connector;
mod error;
pub mod http;
mod signed;

pub use client::S3Client;
pub use connector::{ClientOptions, DEFAULT_CONNECT_TIMEOUT, S3Connector};
pub use http::HttpFetcher;
