// src/storage/memory.rs
//! In-process bucket store for local runs and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{bail, Result};

use super::{ObjectLocation, ObjectStore};

type Buckets = HashMap<String, BTreeMap<String, Vec<u8>>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<Buckets>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given buckets already created.
    pub fn with_buckets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for name in names {
            store.create_bucket(name);
        }
        store
    }

    // A panic while holding the lock cannot leave the maps half-updated.
    fn read(&self) -> RwLockReadGuard<'_, Buckets> {
        self.buckets.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Buckets> {
        self.buckets.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn create_bucket(&self, name: impl Into<String>) {
        self.write().entry(name.into()).or_default();
    }

    pub fn put_object(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) -> Result<()> {
        let mut buckets = self.write();
        let Some(objects) = buckets.get_mut(bucket) else {
            bail!("NoSuchBucket: {bucket}");
        };
        objects.insert(key.to_string(), body.into());
        Ok(())
    }

    pub fn get_object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.read().get(bucket).and_then(|o| o.get(key).cloned())
    }

    /// Keys in `bucket`, sorted; empty when the bucket does not exist.
    pub fn list_keys(&self, bucket: &str) -> Vec<String> {
        self.read()
            .get(bucket)
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    // A missing bucket reads as a missing object, like a HEAD 404 from S3.
    async fn object_exists(&self, location: &ObjectLocation) -> Result<bool> {
        Ok(self
            .read()
            .get(&location.bucket)
            .is_some_and(|o| o.contains_key(&location.key)))
    }

    async fn copy_object(&self, source: &ObjectLocation, destination: &ObjectLocation) -> Result<()> {
        let mut buckets = self.write();
        let Some(body) = buckets
            .get(&source.bucket)
            .and_then(|o| o.get(&source.key))
            .cloned()
        else {
            bail!("NoSuchKey: {source}");
        };
        let Some(objects) = buckets.get_mut(&destination.bucket) else {
            bail!("NoSuchBucket: {}", destination.bucket);
        };
        objects.insert(destination.key.clone(), body);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
