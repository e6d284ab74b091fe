//! Chat notifications about sort outcomes. Best-effort: the sorter never lets
//! a failed notification change an invocation's result.

pub mod slack;

use std::sync::Arc;

use anyhow::Result;

use crate::config::SlackConfig;
use crate::error::SortError;
use crate::sorter::TransferResult;
use crate::storage::ObjectLocation;

pub use slack::SlackNotifier;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Used when no chat channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait::async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, _text: &str) -> Result<()> {
        tracing::debug!("notifications disabled");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

pub fn from_config(slack: Option<&SlackConfig>) -> Arc<dyn Notifier> {
    match slack {
        Some(cfg) => Arc::new(SlackNotifier::from_config(cfg)),
        None => Arc::new(DisabledNotifier),
    }
}

pub fn success_message(result: &TransferResult) -> String {
    let dest = result
        .destination
        .as_ref()
        .map(|d| d.bucket.as_str())
        .unwrap_or("?");
    if result.dry_run {
        format!(
            "[dry run] File ({}) would be sorted to {}",
            result.source.key, dest
        )
    } else {
        format!("File ({}) Successfully Sorted to {}", result.source.key, dest)
    }
}

pub fn failure_message(source: &ObjectLocation, err: &SortError) -> String {
    format!("Error Sorting File ({}) - {}", source.key, err)
}
