// src/storage/s3.rs
//! S3 implementation of [`ObjectStore`] on top of the AWS SDK.

use anyhow::{anyhow, Result};
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;

use super::{ObjectLocation, ObjectStore};
use crate::config::StorageConfig;

pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build a client from the default AWS credential chain.
    ///
    /// Transient failures are retried by the SDK's standard retry mode, bounded
    /// by `max_attempts`. A custom endpoint switches to path-style addressing
    /// for S3-compatible services.
    pub async fn new(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts.max(1)));
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.endpoint_url.is_some())
            .build();
        Self {
            client: Client::from_conf(s3_config),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Store {
    async fn object_exists(&self, location: &ObjectLocation) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(anyhow!("head_object {location}: {}", DisplayErrorContext(&err))),
        }
    }

    async fn copy_object(&self, source: &ObjectLocation, destination: &ObjectLocation) -> Result<()> {
        let copy_source = format!("{}/{}", source.bucket, urlencoding::encode(&source.key));
        let out = self
            .client
            .copy_object()
            .copy_source(copy_source)
            .bucket(&destination.bucket)
            .key(&destination.key)
            .send()
            .await
            .map_err(|e| {
                anyhow!("copy_object {source} -> {destination}: {}", DisplayErrorContext(&e))
            })?;

        let etag = out
            .copy_object_result()
            .and_then(|r| r.e_tag())
            .unwrap_or_default();
        tracing::debug!(%source, %destination, etag, "S3 copy completed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
