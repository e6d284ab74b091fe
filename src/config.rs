// src/config.rs
//! Runtime configuration, read from the process environment.
//!
//! `.env` files are honoured by callers running `dotenvy::dotenv()` first.

use std::path::PathBuf;
use std::time::Duration;

pub const ENV_ENVIRONMENT: &str = "SORTER_ENVIRONMENT";
/// Older deployments set the Lambda variable instead.
pub const ENV_LAMBDA_ENVIRONMENT: &str = "LAMBDA_ENVIRONMENT";
pub const ENV_DRY_RUN: &str = "SORTER_DRY_RUN";
pub const ENV_SLACK_TOKEN: &str = "SDC_AWS_SLACK_TOKEN";
pub const ENV_SLACK_CHANNEL: &str = "SDC_AWS_SLACK_CHANNEL";
pub const ENV_SLACK_RETRIES: &str = "SORTER_SLACK_RETRIES";
pub const ENV_SLACK_RETRY_DELAY: &str = "SORTER_SLACK_RETRY_DELAY_SECS";
pub const ENV_AUDIT_LOG_PATH: &str = "SORTER_AUDIT_LOG_PATH";
pub const ENV_S3_ENDPOINT_URL: &str = "SORTER_S3_ENDPOINT_URL";
pub const ENV_S3_MAX_ATTEMPTS: &str = "SORTER_S3_MAX_ATTEMPTS";
pub const ENV_AWS_REGION: &str = "AWS_REGION";

pub const DEFAULT_ENVIRONMENT: &str = "DEVELOPMENT";
const DEFAULT_SLACK_RETRIES: u32 = 3;
const DEFAULT_SLACK_RETRY_DELAY_SECS: u64 = 1;
const DEFAULT_S3_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackConfig {
    pub token: String,
    pub channel: String,
    pub retries: u32,
    pub retry_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub region: Option<String>,
    /// For MinIO/S3-compatible services.
    pub endpoint_url: Option<String>,
    pub max_attempts: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint_url: None,
            max_attempts: DEFAULT_S3_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SorterConfig {
    pub environment: String,
    pub dry_run: bool,
    /// Slack notifications are enabled only when both token and channel are set.
    pub slack: Option<SlackConfig>,
    /// JSON Lines audit file; `None` keeps audit records in the log stream.
    pub audit_log_path: Option<PathBuf>,
    pub storage: StorageConfig,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            dry_run: false,
            slack: None,
            audit_log_path: None,
            storage: StorageConfig::default(),
        }
    }
}

impl SorterConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| {
            lookup(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment = get(ENV_ENVIRONMENT)
            .or_else(|| get(ENV_LAMBDA_ENVIRONMENT))
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let slack = match (get(ENV_SLACK_TOKEN), get(ENV_SLACK_CHANNEL)) {
            (Some(token), Some(channel)) => Some(SlackConfig {
                token,
                channel,
                retries: parse_or(get(ENV_SLACK_RETRIES), DEFAULT_SLACK_RETRIES),
                retry_delay: Duration::from_secs(parse_or(
                    get(ENV_SLACK_RETRY_DELAY),
                    DEFAULT_SLACK_RETRY_DELAY_SECS,
                )),
            }),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!("Slack needs both {ENV_SLACK_TOKEN} and {ENV_SLACK_CHANNEL}; notifications disabled");
                None
            }
            (None, None) => None,
        };

        Self {
            environment,
            dry_run: get(ENV_DRY_RUN).is_some_and(|v| parse_flag(&v)),
            slack,
            audit_log_path: get(ENV_AUDIT_LOG_PATH).map(PathBuf::from),
            storage: StorageConfig {
                region: get(ENV_AWS_REGION),
                endpoint_url: get(ENV_S3_ENDPOINT_URL),
                max_attempts: parse_or(get(ENV_S3_MAX_ATTEMPTS), DEFAULT_S3_MAX_ATTEMPTS),
            },
        }
    }
}

pub fn parse_flag(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_or<T: std::str::FromStr>(v: Option<String>, default: T) -> T {
    v.and_then(|s| s.parse().ok()).unwrap_or(default)
}
