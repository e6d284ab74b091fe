// src/audit.rs
//! Audit trail of sort invocations.
//!
//! One [`AuditRecord`] is written per invocation, whatever the outcome. Sinks
//! are best-effort: the sorter logs and drops their errors.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::sorter::TransferResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Put,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub ts: DateTime<Utc>,
    pub action: AuditAction,
    pub environment: String,
    pub source_bucket: String,
    pub file_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_file_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub dry_run: bool,
    pub outcome: AuditOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AuditRecord {
    pub fn from_result(result: &TransferResult, environment: &str, etag: Option<&str>) -> Self {
        Self {
            ts: result.finished_at,
            action: AuditAction::Put,
            environment: environment.to_string(),
            source_bucket: result.source.bucket.clone(),
            file_key: result.source.key.clone(),
            destination_bucket: result.destination.as_ref().map(|d| d.bucket.clone()),
            new_file_key: result.destination.as_ref().map(|d| d.key.clone()),
            etag: etag.map(str::to_string),
            dry_run: result.dry_run,
            outcome: if result.success {
                AuditOutcome::Succeeded
            } else {
                AuditOutcome::Failed
            },
            error_kind: result.error.as_ref().map(|e| e.kind.clone()),
            message: result.error.as_ref().map(|e| e.message.clone()),
        }
    }
}

#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Writes audit records into the structured log stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditSink;

#[async_trait::async_trait]
impl AuditSink for LogAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<()> {
        let json = serde_json::to_string(record).context("serialize audit record")?;
        tracing::info!(target: "file_sorter::audit", record = %json, "audit");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Append-only JSON Lines file, one record per line.
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("serialize audit record")?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening audit log {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .context("appending audit record")?;
        file.flush().await.context("flushing audit log")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}
