// src/event.rs
//! Decoding of S3 bucket notifications into per-file sort inputs.

use serde::{Deserialize, Serialize};

use crate::error::SortError;
use crate::storage::ObjectLocation;

/// One arrived object. Fields may be blank; the sorter rejects those.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingFileEvent {
    pub source: ObjectLocation,
    /// Object ETag as reported by the notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Deployment environment for this invocation; the sorter's own when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl IncomingFileEvent {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            source: ObjectLocation::new(bucket, key),
            etag: None,
            environment: None,
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }
}

// --- S3 notification shape (only the fields we read) ---

#[derive(Debug, Deserialize)]
struct S3Notification {
    #[serde(rename = "Records", default)]
    records: Vec<S3Record>,
}

#[derive(Debug, Deserialize)]
struct S3Record {
    #[serde(rename = "eventName", default)]
    event_name: Option<String>,
    #[serde(default)]
    s3: Option<S3Entity>,
}

#[derive(Debug, Default, Deserialize)]
struct S3Entity {
    #[serde(default)]
    bucket: Option<S3Bucket>,
    #[serde(default)]
    object: Option<S3Object>,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    #[serde(default)]
    key: Option<String>,
    #[serde(rename = "eTag", default)]
    e_tag: Option<String>,
}

/// Decode an S3 notification body into one event per record.
///
/// Missing bucket names or keys come through blank so that the sorter reports
/// them per record. Only an undecodable body or an empty record list fails here.
pub fn parse_s3_event(body: &str) -> Result<Vec<IncomingFileEvent>, SortError> {
    let notification: S3Notification = serde_json::from_str(body)
        .map_err(|e| SortError::InvalidEvent(format!("not an S3 notification: {e}")))?;
    if notification.records.is_empty() {
        return Err(SortError::InvalidEvent("event contains no records".to_string()));
    }

    notification
        .records
        .into_iter()
        .map(|record| {
            if let Some(name) = &record.event_name {
                tracing::debug!(event_name = %name, "decoding S3 record");
            }
            let s3 = record.s3.unwrap_or_default();
            let bucket = s3.bucket.and_then(|b| b.name).unwrap_or_default();
            let (key, etag) = match s3.object {
                Some(o) => (o.key.unwrap_or_default(), o.e_tag),
                None => (String::new(), None),
            };
            Ok(IncomingFileEvent {
                source: ObjectLocation::new(bucket, decode_key(&key)?),
                etag,
                environment: None,
            })
        })
        .collect()
}

/// S3 notifications form-encode keys: `+` is a space, the rest is percent-encoded.
pub fn decode_key(raw: &str) -> Result<String, SortError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|k| k.into_owned())
        .map_err(|e| SortError::InvalidEvent(format!("object key {raw:?} is not valid UTF-8: {e}")))
}
