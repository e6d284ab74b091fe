// src/storage/mod.rs
//! Object storage seam used by the sorter.

pub mod memory;
pub mod s3;

use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use memory::MemoryStore;
pub use s3::S3Store;

/// A bucket + key pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Storage backend. Transient-error retries belong to the implementation.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn object_exists(&self, location: &ObjectLocation) -> Result<bool>;

    /// Copy `source` to `destination`; either the whole object lands or an error is returned.
    async fn copy_object(&self, source: &ObjectLocation, destination: &ObjectLocation) -> Result<()>;

    fn name(&self) -> &'static str;
}
