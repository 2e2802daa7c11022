//! Object-store adapter seam.
//!
//! Implementations translate their transport's failures into
//! [`ObjectStoreError`] kinds; nothing above this layer looks at raw status
//! codes or message text.

use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use thiserror::Error;

/// User metadata attached to an object (`x-amz-meta-*` on S3).
pub type Metadata = BTreeMap<String, String>;

/// Classified object-store failure.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("not found")]
    NotFound,

    #[error("access denied")]
    Forbidden,

    /// The bucket lives in another region or endpoint.
    #[error("moved permanently")]
    MovedPermanently,

    /// Any other HTTP failure, with the provider's error code when it sent one.
    #[error("HTTP {status}{}: {message}", .code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ObjectStoreError {
    /// Classify an HTTP failure. `body` may be an S3 XML error document.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            404 => ObjectStoreError::NotFound,
            403 => ObjectStoreError::Forbidden,
            301 => ObjectStoreError::MovedPermanently,
            _ => ObjectStoreError::Status {
                status,
                code: xml_element(body, "Code"),
                message: xml_element(body, "Message").unwrap_or_else(|| body.trim().to_string()),
            },
        }
    }

    /// HTTP status behind this error, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ObjectStoreError::NotFound => Some(404),
            ObjectStoreError::Forbidden => Some(403),
            ObjectStoreError::MovedPermanently => Some(301),
            ObjectStoreError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn xml_element(body: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(body[start..end].to_string())
}

/// Raw object-store operations consumed by [`crate::ContentStore`].
///
/// All calls block until the provider has answered; uploads return only once
/// the object is fully stored.
pub trait ObjectStoreClient {
    /// Lightweight existence probe for a bucket.
    fn head_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError>;

    fn create_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError>;

    /// User metadata of an object; [`ObjectStoreError::NotFound`] when absent.
    fn head_object(&self, bucket: &str, key: &str) -> Result<Metadata, ObjectStoreError>;

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        metadata: &Metadata,
    ) -> Result<(), ObjectStoreError>;

    /// Pre-authorized GET URL valid for `ttl`.
    fn presign_get(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, ObjectStoreError>;

    /// Fetch a presigned handle into `sink`, returning the byte count.
    fn download(&self, handle: &str, sink: &mut dyn Write) -> Result<u64, ObjectStoreError>;
}

impl<C: ObjectStoreClient + ?Sized> ObjectStoreClient for &C {
    fn head_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        (**self).head_bucket(bucket)
    }

    fn create_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        (**self).create_bucket(bucket)
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<Metadata, ObjectStoreError> {
        (**self).head_object(bucket, key)
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        metadata: &Metadata,
    ) -> Result<(), ObjectStoreError> {
        (**self).put_object(bucket, key, body, metadata)
    }

    fn presign_get(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, ObjectStoreError> {
        (**self).presign_get(bucket, key, ttl)
    }

    fn download(&self, handle: &str, sink: &mut dyn Write) -> Result<u64, ObjectStoreError> {
        (**self).download(handle, sink)
    }
}
