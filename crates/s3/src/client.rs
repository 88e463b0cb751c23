//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from rcprobe-core.
//! Retries are disabled: the probe decides about further attempts itself.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use bytes::Bytes;
use http::Method;
use jiff::Timestamp;
use rcprobe_core::{
    Address, CompletedPart, Error, ObjectInfo, ObjectStore, ObjectType, RemotePath, Result,
    StorageCredentials,
};
use tokio::io::AsyncWriteExt;

use crate::connector::ClientOptions;
use crate::error::map_sdk_error;
use crate::signed::SignedRequester;

const OBJECT_TYPE_HEADER: &str = "x-oss-object-type";
const NEXT_APPEND_POSITION_HEADER: &str = "x-oss-next-append-position";

/// S3 client bound to one address
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    signed: SignedRequester,
}

impl S3Client {
    /// Create a client for `address`.
    ///
    /// Nothing is dialed here; connection failures surface on the first request.
    pub async fn new(
        address: &Address,
        credentials: &StorageCredentials,
        options: &ClientOptions,
        http: reqwest::Client,
    ) -> Result<Self> {
        let endpoint = address.endpoint_url();

        let sdk_credentials = aws_credential_types::Credentials::new(
            &credentials.access_key_id,
            &credentials.access_key_secret,
            credentials.sts_token.clone(),
            None,
            "rcprobe-static-credentials",
        );

        let timeouts = aws_config::timeout::TimeoutConfig::builder()
            .connect_timeout(options.connect_timeout)
            .build();

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(sdk_credentials)
            .region(aws_config::Region::new(credentials.region.clone()))
            .endpoint_url(&endpoint)
            .timeout_config(timeouts)
            .retry_config(aws_config::retry::RetryConfig::disabled())
            .load()
            .await;

        // Path-style addressing keeps the bucket out of the host name
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(true)
            .build();

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            signed: SignedRequester::new(http, endpoint, credentials),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

fn header<'a>(response: &'a reqwest::Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

fn trim_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo> {
        let url = self.signed.object_url(path, None);
        let response = self
            .signed
            .send("head_object", Method::HEAD, &url, &[], Bytes::new())
            .await?;

        let size = header(&response, "content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let mut info = ObjectInfo::file(&path.key, size);
        info.etag = header(&response, "etag").map(trim_etag);
        info.content_type = header(&response, "content-type").map(str::to_string);
        info.object_type = header(&response, OBJECT_TYPE_HEADER)
            .map(ObjectType::from_header)
            .unwrap_or_default();
        info.last_modified = header(&response, "last-modified")
            .and_then(|v| jiff::fmt::rfc2822::parse(v).ok())
            .map(|zoned| zoned.timestamp());

        Ok(info)
    }

    async fn download_object(&self, path: &RemotePath, dest: &Path) -> Result<u64> {
        let response = self
            .inner
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error("get_object", e))?;

        let mut body = response.body;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;

        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| Error::Reachability(format!("get_object: body interrupted: {e}")))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    async fn put_object(
        &self,
        path: &RemotePath,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<ObjectInfo> {
        let size = data.len() as u64;

        let mut request = self
            .inner
            .put_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .body(ByteStream::from(data));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_error("put_object", e))?;

        let mut info = ObjectInfo::file(&path.key, size);
        info.etag = response.e_tag().map(trim_etag);
        info.content_type = content_type.map(str::to_string);
        info.last_modified = Some(Timestamp::now());

        Ok(info)
    }

    async fn append_object(&self, path: &RemotePath, position: u64, data: Vec<u8>) -> Result<u64> {
        let written = data.len() as u64;
        let url = self
            .signed
            .object_url(path, Some(&format!("append&position={position}")));

        let response = self
            .signed
            .send("append_object", Method::POST, &url, &[], Bytes::from(data))
            .await?;

        let next = header(&response, NEXT_APPEND_POSITION_HEADER)
            .and_then(|v| v.parse().ok())
            .unwrap_or(position + written);
        Ok(next)
    }

    async fn create_multipart_upload(&self, path: &RemotePath) -> Result<String> {
        let response = self
            .inner
            .create_multipart_upload()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error("create_multipart_upload", e))?;

        response
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| Error::General("create_multipart_upload: no upload id returned".into()))
    }

    async fn upload_part(
        &self,
        path: &RemotePath,
        upload_id: &str,
        part_number: i32,
        data: Vec<u8>,
    ) -> Result<CompletedPart> {
        let size_bytes = data.len() as u64;

        let response = self
            .inner
            .upload_part()
            .bucket(&path.bucket)
            .key(&path.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_sdk_error("upload_part", e))?;

        let etag = response.e_tag().map(trim_etag).ok_or_else(|| {
            Error::General(format!("upload_part: no ETag returned for part {part_number}"))
        })?;

        Ok(CompletedPart {
            part_number,
            etag,
            size_bytes,
        })
    }

    async fn complete_multipart_upload(
        &self,
        path: &RemotePath,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<ObjectInfo> {
        let size = parts.iter().map(|p| p.size_bytes).sum();
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(
                parts
                    .iter()
                    .map(|p| {
                        S3CompletedPart::builder()
                            .part_number(p.part_number)
                            .e_tag(format!("\"{}\"", p.etag))
                            .build()
                    })
                    .collect(),
            ))
            .build();

        let response = self
            .inner
            .complete_multipart_upload()
            .bucket(&path.bucket)
            .key(&path.key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| map_sdk_error("complete_multipart_upload", e))?;

        let mut info = ObjectInfo::file(&path.key, size);
        info.etag = response.e_tag().map(trim_etag);
        info.object_type = ObjectType::Multipart;
        info.last_modified = Some(Timestamp::now());

        Ok(info)
    }

    async fn abort_multipart_upload(&self, path: &RemotePath, upload_id: &str) -> Result<()> {
        self.inner
            .abort_multipart_upload()
            .bucket(&path.bucket)
            .key(&path.key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| map_sdk_error("abort_multipart_upload", e))?;

        Ok(())
    }

    async fn delete_object(&self, path: &RemotePath) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error("delete_object", e))?;

        Ok(())
    }
}
