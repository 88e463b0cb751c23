//! Storage client boundary
//!
//! These traits are what the probe engine needs from a storage client and an
//! HTTP client. They are independent of any SDK; `rcprobe-s3` implements them
//! on top of aws-sdk-s3 and reqwest.

use std::path::Path;

use async_trait::async_trait;
use jiff::Timestamp;
use url::Url;

use crate::address::Address;
use crate::credentials::StorageCredentials;
use crate::error::Result;
use crate::target::RemotePath;

/// How an object was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectType {
    /// Single PUT
    #[default]
    Normal,
    /// Append writes; can be appended to further
    Appendable,
    /// Completed multipart session
    Multipart,
}

impl ObjectType {
    /// Parse the server's object type header value
    pub fn from_header(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "appendable" => ObjectType::Appendable,
            "multipart" => ObjectType::Multipart,
            _ => ObjectType::Normal,
        }
    }
}

/// Metadata of a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size_bytes: u64,
    pub etag: Option<String>,
    pub object_type: ObjectType,
    pub content_type: Option<String>,
    pub last_modified: Option<Timestamp>,
}

impl ObjectInfo {
    /// Create metadata for a normal object
    pub fn file(key: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            key: key.into(),
            size_bytes,
            etag: None,
            object_type: ObjectType::Normal,
            content_type: None,
            last_modified: None,
        }
    }
}

/// One uploaded part of a multipart session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    pub part_number: i32,
    pub etag: String,
    pub size_bytes: u64,
}

/// Outcome of a plain URL download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    pub bytes_written: u64,
    /// Content-Length announced by the server, if any
    pub content_length: Option<u64>,
}

/// Object operations a probe performs against a storage endpoint.
///
/// Implementations must classify failures: [`crate::Error::Reachability`]
/// when no HTTP response arrived, [`crate::Error::RemoteRejection`] when one
/// did with an error status.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get object metadata. Missing objects are `RemoteRejection` with `NotFound`.
    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo>;

    /// Stream an object into `dest`, returning the number of bytes written
    async fn download_object(&self, path: &RemotePath, dest: &Path) -> Result<u64>;

    /// Upload an object in one request
    async fn put_object(
        &self,
        path: &RemotePath,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<ObjectInfo>;

    /// Append `data` at `position`, returning the next append position
    async fn append_object(&self, path: &RemotePath, position: u64, data: Vec<u8>) -> Result<u64>;

    /// Start a multipart session, returning its upload id
    async fn create_multipart_upload(&self, path: &RemotePath) -> Result<String>;

    /// Upload one part of a multipart session
    async fn upload_part(
        &self,
        path: &RemotePath,
        upload_id: &str,
        part_number: i32,
        data: Vec<u8>,
    ) -> Result<CompletedPart>;

    /// Finish a multipart session; `parts` must be in ascending part-number order
    async fn complete_multipart_upload(
        &self,
        path: &RemotePath,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<ObjectInfo>;

    /// Discard a multipart session and its uploaded parts
    async fn abort_multipart_upload(&self, path: &RemotePath, upload_id: &str) -> Result<()>;

    async fn delete_object(&self, path: &RemotePath) -> Result<()>;
}

/// Builds a storage client bound to one network address
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(
        &self,
        address: &Address,
        credentials: &StorageCredentials,
    ) -> Result<Box<dyn ObjectStore>>;
}

/// Plain HTTP GET of a URL into a local file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlFetcher: Send + Sync {
    async fn fetch(&self, url: &Url, dest: &Path) -> Result<FetchReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type_from_header() {
        assert_eq!(ObjectType::from_header("Appendable"), ObjectType::Appendable);
        assert_eq!(ObjectType::from_header("Multipart"), ObjectType::Multipart);
        assert_eq!(ObjectType::from_header("Normal"), ObjectType::Normal);
        assert_eq!(ObjectType::from_header(""), ObjectType::Normal);
    }

    #[test]
    fn test_object_info_creation() {
        let info = ObjectInfo::file("test.txt", 1024);
        assert_eq!(info.key, "test.txt");
        assert_eq!(info.size_bytes, 1024);
        assert_eq!(info.object_type, ObjectType::Normal);
    }
}
