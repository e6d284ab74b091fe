use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;

use super::Notifier;
use crate::config::SlackConfig;

pub const SLACK_API_BASE: &str = "https://slack.com/api";

/// Posts messages through Slack's `chat.postMessage` Web API.
#[derive(Clone)]
pub struct SlackNotifier {
    token: String,
    channel: String,
    api_base: String,
    client: Client,
    timeout: Duration,
    retries: u32,
    retry_delay: Duration,
}

#[derive(Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            channel: channel.into(),
            api_base: SLACK_API_BASE.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(5),
            retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn from_config(cfg: &SlackConfig) -> Self {
        Self::new(cfg.token.clone(), cfg.channel.clone())
            .with_retries(cfg.retries)
            .with_retry_delay(cfg.retry_delay)
    }

    /// Point at a different API root (tests, proxies).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Extra attempts after the first one.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    async fn post_once(&self, text: &str) -> Result<()> {
        let body = serde_json::json!({ "channel": self.channel, "text": text });
        let rsp: SlackResponse = self
            .client
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(&self.token)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?
            .json()
            .await
            .context("slack response body")?;

        if !rsp.ok {
            bail!(
                "slack api error: {}",
                rsp.error.as_deref().unwrap_or("unknown")
            );
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.post_once(text).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt <= self.retries => {
                    let error = format!("{e:#}");
                    tracing::debug!(attempt, %error, "slack send failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    return Err(anyhow!(
                        "slack message to {} failed after {attempt} attempt(s): {e:#}",
                        self.channel
                    ))
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
