// src/sorter.rs
//! Transfer executor: one arrived file in, one copy (or none) out.
//!
//! Each invocation walks Init → Parse → Resolve → Verify Source → Execute and
//! then reports the outcome to the audit sink, metrics and the notifier.
//! Dry runs go through every check, including the source lookup, and only
//! skip the copy.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::audit::{AuditRecord, AuditSink, JsonlAuditSink, LogAuditSink};
use crate::config::SorterConfig;
use crate::error::{ErrorInfo, SortError};
use crate::event::{parse_s3_event, IncomingFileEvent};
use crate::instrument::Instrument;
use crate::metrics;
use crate::naming::{self, HermesGrammar, NamingGrammar};
use crate::notify::{self, DisabledNotifier, Notifier};
use crate::routing::DestinationMapping;
use crate::storage::{ObjectLocation, ObjectStore, S3Store};

/// Outcome of one invocation, handed to audit, notification and callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferResult {
    pub success: bool,
    pub source: ObjectLocation,
    pub destination: Option<ObjectLocation>,
    pub instrument: Option<Instrument>,
    pub dry_run: bool,
    pub error: Option<ErrorInfo>,
    pub finished_at: DateTime<Utc>,
}

impl TransferResult {
    fn pending(source: ObjectLocation, dry_run: bool) -> Self {
        Self {
            success: false,
            source,
            destination: None,
            instrument: None,
            dry_run,
            error: None,
            finished_at: Utc::now(),
        }
    }
}

/// Per-call overrides for [`FileSorter::sort_event`]. Also the `/sort` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SortOptions {
    #[serde(default)]
    pub dry_run: Option<bool>,
    #[serde(default)]
    pub environment: Option<String>,
}

pub struct FileSorter {
    grammar: Arc<dyn NamingGrammar>,
    mapping: Arc<DestinationMapping>,
    // Built-in tables follow the invocation environment; overrides are fixed.
    mapping_overridden: bool,
    store: Arc<dyn ObjectStore>,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
    environment: String,
    dry_run: bool,
}

pub struct FileSorterBuilder {
    grammar: Arc<dyn NamingGrammar>,
    mapping: Option<Arc<DestinationMapping>>,
    store: Arc<dyn ObjectStore>,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
    environment: String,
    dry_run: bool,
}

impl FileSorterBuilder {
    pub fn grammar(mut self, grammar: Arc<dyn NamingGrammar>) -> Self {
        self.grammar = grammar;
        self
    }

    /// Defaults to the built-in table for the configured environment.
    pub fn mapping(mut self, mapping: DestinationMapping) -> Self {
        self.mapping = Some(Arc::new(mapping));
        self
    }

    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Default dry-run mode for [`FileSorter::sort_event`].
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn build(self) -> FileSorter {
        let mapping_overridden = self.mapping.is_some();
        let mapping = self
            .mapping
            .unwrap_or_else(|| Arc::new(DestinationMapping::for_environment(&self.environment)));
        FileSorter {
            grammar: self.grammar,
            mapping,
            mapping_overridden,
            store: self.store,
            audit: self.audit,
            notifier: self.notifier,
            environment: self.environment,
            dry_run: self.dry_run,
        }
    }
}

impl FileSorter {
    pub fn builder(store: Arc<dyn ObjectStore>) -> FileSorterBuilder {
        FileSorterBuilder {
            grammar: Arc::new(HermesGrammar),
            mapping: None,
            store,
            audit: Arc::new(LogAuditSink),
            notifier: Arc::new(DisabledNotifier),
            environment: crate::config::DEFAULT_ENVIRONMENT.to_string(),
            dry_run: false,
        }
    }

    /// Production wiring: S3 storage, audit and Slack per `config`.
    pub async fn from_config(config: &SorterConfig) -> Result<Self> {
        let mapping = DestinationMapping::load_override()?;
        let store = S3Store::new(&config.storage).await;
        let audit: Arc<dyn AuditSink> = match &config.audit_log_path {
            Some(path) => Arc::new(JsonlAuditSink::new(path)),
            None => Arc::new(LogAuditSink),
        };

        info!(
            environment = %config.environment,
            dry_run = config.dry_run,
            destinations_file = mapping.is_some(),
            audit = audit.name(),
            slack = config.slack.is_some(),
            "file sorter configured"
        );

        let mut builder = Self::builder(Arc::new(store))
            .audit(audit)
            .notifier(notify::from_config(config.slack.as_ref()))
            .environment(config.environment.clone())
            .dry_run(config.dry_run);
        if let Some(mapping) = mapping {
            builder = builder.mapping(mapping);
        }
        Ok(builder.build())
    }

    pub fn mapping(&self) -> &DestinationMapping {
        &self.mapping
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn default_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Environment an invocation runs in: the event's own, else the sorter's.
    fn environment_for<'a>(&'a self, event: &'a IncomingFileEvent) -> &'a str {
        event
            .environment
            .as_deref()
            .filter(|env| !env.trim().is_empty())
            .unwrap_or(&self.environment)
    }

    /// Route a single file. Every outcome is reported before returning.
    #[instrument(skip_all, fields(
        bucket = %event.source.bucket,
        key = %event.source.key,
        environment = %self.environment_for(event),
        dry_run = dry_run,
    ))]
    pub async fn sort(&self, event: &IncomingFileEvent, dry_run: bool) -> Result<TransferResult, SortError> {
        let mut result = TransferResult::pending(event.source.clone(), dry_run);
        let outcome = self.run(event, dry_run, &mut result).await;

        result.finished_at = Utc::now();
        match &outcome {
            Ok(()) => {
                result.success = true;
                info!(
                    destination = ?result.destination.as_ref().map(ToString::to_string),
                    "file sorted"
                );
            }
            Err(err) => {
                result.error = Some(ErrorInfo::from(err));
                error!(kind = err.kind(), error = %err, "file sort failed");
            }
        }

        self.report(event, &result, outcome.as_ref().err()).await;
        outcome.map(|()| result)
    }

    /// Decode an S3 notification and route each record in order. `options`
    /// override the configured dry-run mode and environment. Outcomes are
    /// paired with the source they belong to.
    pub async fn sort_event(
        &self,
        body: &str,
        options: &SortOptions,
    ) -> Result<Vec<(ObjectLocation, Result<TransferResult, SortError>)>, SortError> {
        let events = parse_s3_event(body).inspect_err(|err| {
            error!(kind = err.kind(), error = %err, "rejected trigger event");
            metrics::record_rejected_event();
        })?;
        let dry_run = options.dry_run.unwrap_or(self.dry_run);

        let mut results = Vec::with_capacity(events.len());
        for mut event in events {
            if event.environment.is_none() {
                event.environment = options.environment.clone();
            }
            let outcome = self.sort(&event, dry_run).await;
            results.push((event.source, outcome));
        }
        Ok(results)
    }

    async fn run(
        &self,
        event: &IncomingFileEvent,
        dry_run: bool,
        result: &mut TransferResult,
    ) -> Result<(), SortError> {
        // Init
        if event.source.bucket.trim().is_empty() {
            return Err(SortError::InvalidEvent("missing source bucket name".to_string()));
        }
        if event.source.key.trim().is_empty() {
            return Err(SortError::InvalidEvent("missing object key".to_string()));
        }
        info!(etag = event.etag.as_deref().unwrap_or("-"), "incoming file accepted");

        // Parse
        let identity = naming::parse_identity(self.grammar.as_ref(), &event.source.key)?;
        result.instrument = Some(identity.instrument);
        info!(
            instrument = %identity.instrument,
            level = %identity.level,
            version = %identity.version,
            "filename parsed"
        );

        // Resolve
        let environment = self.environment_for(event);
        let bucket = if self.mapping_overridden || environment == self.environment {
            self.mapping.resolve_instrument(identity.instrument)?.to_string()
        } else {
            DestinationMapping::for_environment(environment)
                .resolve_instrument(identity.instrument)?
                .to_string()
        };
        let destination = ObjectLocation::new(bucket, event.source.key.clone());
        info!(destination_bucket = %destination.bucket, "destination resolved");
        result.destination = Some(destination.clone());

        // Verify source
        match self.store.object_exists(&event.source).await {
            Ok(true) => {}
            Ok(false) => return Err(SortError::SourceNotFound(event.source.to_string())),
            Err(e) => {
                return Err(SortError::TransferFailed(format!(
                    "checking {} on {}: {e:#}",
                    event.source,
                    self.store.name()
                )))
            }
        }

        // Execute
        if dry_run {
            info!(%destination, "dry run, copy skipped");
            return Ok(());
        }
        info!(from = %event.source.bucket, to = %destination.bucket, "copying file");
        self.store
            .copy_object(&event.source, &destination)
            .await
            .map_err(|e| SortError::TransferFailed(format!("{e:#}")))
    }

    async fn report(&self, event: &IncomingFileEvent, result: &TransferResult, err: Option<&SortError>) {
        metrics::record_result(result, err);

        let record =
            AuditRecord::from_result(result, self.environment_for(event), event.etag.as_deref());
        if let Err(e) = self.audit.record(&record).await {
            let error = format!("{e:#}");
            warn!(sink = self.audit.name(), %error, "audit record dropped");
        }

        let text = match err {
            None => notify::success_message(result),
            Some(err) => notify::failure_message(&event.source, err),
        };
        if let Err(e) = self.notifier.send(&text).await {
            let error = format!("{e:#}");
            warn!(notifier = self.notifier.name(), %error, "notification failed");
        }
    }
}
