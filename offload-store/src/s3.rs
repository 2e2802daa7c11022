//! S3-compatible [`ObjectStoreClient`] over `rusty-s3` presigned requests.
//!
//! Every request is a presigned URL executed with a blocking `ureq` agent.
//! No retries happen here; a failed call surfaces as its classified kind.

use std::io::{self, Write};
use std::time::Duration;

use rusty_s3::actions::S3Action;
use rusty_s3::{Bucket, Credentials as S3Credentials, UrlStyle};
use url::Url;

use offload_core::config::{Credentials, StoreConfig};

use crate::client::{Metadata, ObjectStoreClient, ObjectStoreError};
use crate::error::StoreError;

/// Validity of the short-lived URLs used for our own requests.
const REQUEST_SIGN_DURATION: Duration = Duration::from_secs(300);

const METADATA_HEADER_PREFIX: &str = "x-amz-meta-";

pub struct S3Client {
    endpoint: Url,
    region: String,
    credentials: Option<S3Credentials>,
    agent: ureq::Agent,
}

impl S3Client {
    pub fn new(
        endpoint: &str,
        region: &str,
        credentials: Option<Credentials>,
    ) -> Result<Self, StoreError> {
        let endpoint = endpoint
            .parse()
            .map_err(|e| StoreError::Config(format!("invalid S3 endpoint URL '{endpoint}': {e}")))?;

        let credentials = credentials.map(|c| match c.session_token {
            Some(token) => S3Credentials::new_with_token(c.access_key_id, c.secret_access_key, token),
            None => S3Credentials::new(c.access_key_id, c.secret_access_key),
        });

        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(30))
            .timeout_read(Duration::from_secs(300))
            .timeout_write(Duration::from_secs(300))
            .build();

        Ok(Self {
            endpoint,
            region: region.to_string(),
            credentials,
            agent,
        })
    }

    /// Build from the `store` config section, resolving credentials.
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::new(&config.endpoint, &config.region, config.credentials())
    }

    fn bucket(&self, name: &str) -> Result<Bucket, ObjectStoreError> {
        // Endpoint is always explicit; use path-style addressing.
        Bucket::new(
            self.endpoint.clone(),
            UrlStyle::Path,
            name.to_string(),
            self.region.clone(),
        )
        .map_err(|e| ObjectStoreError::InvalidRequest(format!("bucket '{name}': {e}")))
    }
}

impl ObjectStoreClient for S3Client {
    fn head_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        let url = self
            .bucket(bucket)?
            .head_bucket(self.credentials.as_ref())
            .sign(REQUEST_SIGN_DURATION);
        self.agent.head(url.as_str()).call().map_err(classify)?;
        Ok(())
    }

    fn create_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            ObjectStoreError::InvalidRequest("creating a bucket requires credentials".to_string())
        })?;
        let handle = self.bucket(bucket)?;
        let url = handle.create_bucket(credentials).sign(REQUEST_SIGN_DURATION);

        // us-east-1 rejects an explicit location constraint; every other region requires one.
        let body = if self.region == "us-east-1" {
            String::new()
        } else {
            format!(
                "<CreateBucketConfiguration><LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>",
                self.region
            )
        };
        self.agent
            .put(url.as_str())
            .send_string(&body)
            .map_err(classify)?;
        Ok(())
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<Metadata, ObjectStoreError> {
        let url = self
            .bucket(bucket)?
            .head_object(self.credentials.as_ref(), key)
            .sign(REQUEST_SIGN_DURATION);
        let resp = self.agent.head(url.as_str()).call().map_err(classify)?;

        let mut metadata = Metadata::new();
        for name in resp.headers_names() {
            let lower = name.to_ascii_lowercase();
            if let Some(meta_key) = lower.strip_prefix(METADATA_HEADER_PREFIX) {
                if let Some(value) = resp.header(&name) {
                    metadata.insert(meta_key.to_string(), value.to_string());
                }
            }
        }
        Ok(metadata)
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        metadata: &Metadata,
    ) -> Result<(), ObjectStoreError> {
        let handle = self.bucket(bucket)?;
        let mut action = handle.put_object(self.credentials.as_ref(), key);
        let headers: Vec<(String, String)> = metadata
            .iter()
            .map(|(k, v)| (format!("{METADATA_HEADER_PREFIX}{k}"), v.clone()))
            .collect();
        for (name, value) in &headers {
            action.headers_mut().insert(name.clone(), value.clone());
        }
        let url = action.sign(REQUEST_SIGN_DURATION);

        let mut request = self.agent.put(url.as_str());
        for (name, value) in &headers {
            request = request.set(name, value);
        }
        request.send_bytes(body).map_err(classify)?;
        Ok(())
    }

    fn presign_get(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, ObjectStoreError> {
        let url = self
            .bucket(bucket)?
            .get_object(self.credentials.as_ref(), key)
            .sign(ttl);
        Ok(url.to_string())
    }

    fn download(&self, handle: &str, sink: &mut dyn Write) -> Result<u64, ObjectStoreError> {
        let resp = self.agent.get(handle).call().map_err(classify)?;
        let mut reader = resp.into_reader();
        let copied = io::copy(&mut reader, sink)?;
        Ok(copied)
    }
}

/// Map a `ureq` failure onto an [`ObjectStoreError`] kind.
fn classify(err: ureq::Error) -> ObjectStoreError {
    match err {
        ureq::Error::Status(status, resp) => {
            let body = resp.into_string().unwrap_or_default();
            ObjectStoreError::from_status(status, &body)
        }
        ureq::Error::Transport(transport) => ObjectStoreError::Transport(transport.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> S3Client {
        S3Client::new(
            "http://127.0.0.1:9000",
            "eu-west-1",
            Some(Credentials {
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: None,
            }),
        )
        .unwrap()
    }

    #[test]
    fn invalid_endpoint_is_config_error() {
        let err = S3Client::new("not a url", "us-east-1", None)
            .err()
            .expect("must fail");
        assert!(matches!(err, StoreError::Config(_)), "got: {err}");
    }

    #[test]
    fn presigned_handle_is_path_style_and_signed() {
        let url = client()
            .presign_get("artifacts", "runtime/r.zip", Duration::from_secs(600))
            .unwrap();
        assert!(url.starts_with("http://127.0.0.1:9000/artifacts/runtime/r.zip?"), "{url}");
        assert!(url.contains("X-Amz-Expires=600"), "{url}");
        assert!(url.contains("X-Amz-Signature="), "{url}");
    }

    #[test]
    fn create_bucket_without_credentials_is_rejected_locally() {
        let anonymous = S3Client::new("http://127.0.0.1:9000", "us-east-1", None).unwrap();
        let err = anonymous.create_bucket("artifacts").unwrap_err();
        assert!(matches!(err, ObjectStoreError::InvalidRequest(_)));
    }
}
