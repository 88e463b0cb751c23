//! SigV4-signed raw requests
//!
//! Used for calls the SDK cannot express: OSS append writes and HEAD
//! responses whose `x-oss-*` headers must be read.

use std::time::SystemTime;

use aws_sigv4::http_request::{
    PayloadChecksumKind, PercentEncodingMode, SignableBody, SignableRequest, SigningSettings,
    UriPathNormalizationMode, sign,
};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use bytes::Bytes;
use http::Method;
use rcprobe_core::{Error, RemotePath, Result, StorageCredentials};
use sha2::{Digest, Sha256};

use crate::error::{check_status, map_reqwest_error};

pub(crate) struct SignedRequester {
    http: reqwest::Client,
    endpoint: String,
    region: String,
    identity: Identity,
}

impl SignedRequester {
    pub(crate) fn new(http: reqwest::Client, endpoint: String, credentials: &StorageCredentials) -> Self {
        let identity = aws_credential_types::Credentials::new(
            &credentials.access_key_id,
            &credentials.access_key_secret,
            credentials.sts_token.clone(),
            None,
            "rcprobe-static-credentials",
        )
        .into();

        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            region: credentials.region.clone(),
            identity,
        }
    }

    /// Path-style URL of an object, with an optional raw query string
    pub(crate) fn object_url(&self, path: &RemotePath, query: Option<&str>) -> String {
        let mut url = format!("{}/{}/{}", self.endpoint, path.bucket, encode_key(&path.key));
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// Sign and send a request, failing on non-2xx responses
    pub(crate) async fn send(
        &self,
        op: &str,
        method: Method,
        url: &str,
        headers: &[(&str, String)],
        body: Bytes,
    ) -> Result<reqwest::Response> {
        let payload_hash = hex::encode(Sha256::digest(&body));

        let mut settings = SigningSettings::default();
        settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
        settings.percent_encoding_mode = PercentEncodingMode::Single;
        settings.uri_path_normalization_mode = UriPathNormalizationMode::Disabled;

        let params = v4::SigningParams::builder()
            .identity(&self.identity)
            .region(&self.region)
            .name("s3")
            .time(SystemTime::now())
            .settings(settings)
            .build()
            .map_err(|e| Error::General(format!("{op}: signing parameters: {e}")))?
            .into();

        let signable = SignableRequest::new(
            method.as_str(),
            url,
            headers.iter().map(|(name, value)| (*name, value.as_str())),
            SignableBody::Precomputed(payload_hash),
        )
        .map_err(|e| Error::General(format!("{op}: cannot sign request: {e}")))?;

        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| Error::General(format!("{op}: cannot sign request: {e}")))?
            .into_parts();

        let mut request = self.http.request(method, url).body(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        for (name, value) in instructions.headers() {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| map_reqwest_error(op, e))?;
        check_status(op, response).await
    }
}

/// Percent-encode each key segment, keeping `/` separators
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requester() -> SignedRequester {
        let credentials = StorageCredentials {
            endpoint: "http://oss.example.com".into(),
            access_key_id: "id".into(),
            access_key_secret: "secret".into(),
            sts_token: None,
            region: "us-east-1".into(),
        };
        SignedRequester::new(reqwest::Client::new(), "http://oss.example.com/".into(), &credentials)
    }

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("a/b c/d+e.txt"), "a/b%20c/d%2Be.txt");
        assert_eq!(encode_key("plain"), "plain");
    }

    #[test]
    fn test_object_url() {
        let requester = requester();
        let path = RemotePath::new("bucket", "dir/file name.txt");
        assert_eq!(
            requester.object_url(&path, None),
            "http://oss.example.com/bucket/dir/file%20name.txt"
        );
        assert_eq!(
            requester.object_url(&path, Some("append&position=0")),
            "http://oss.example.com/bucket/dir/file%20name.txt?append&position=0"
        );
    }
}
