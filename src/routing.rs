// src/routing.rs
//! Destination resolution: instrument → destination bucket.
//!
//! The table is built once at startup and shared read-only. It comes from the
//! built-in defaults (optionally prefixed for the development environment) or
//! from a TOML override file:
//!
//! ```toml
//! [destinations]
//! eea = "hermes-eea"
//! spani = "hermes-spani"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};

use crate::error::SortError;
use crate::instrument::Instrument;

pub const ENV_DESTINATIONS_PATH: &str = "SORTER_DESTINATIONS_PATH";
pub const DEFAULT_DESTINATIONS_PATH: &str = "config/destinations.toml";

/// Environment whose buckets carry the `dev-` prefix.
pub const DEVELOPMENT_ENVIRONMENT: &str = "DEVELOPMENT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationMapping {
    buckets: BTreeMap<Instrument, String>,
}

impl Default for DestinationMapping {
    fn default() -> Self {
        let buckets = Instrument::ALL
            .into_iter()
            .map(|inst| (inst, format!("hermes-{}", inst.code())))
            .collect();
        Self { buckets }
    }
}

impl DestinationMapping {
    /// Built-in table for `environment`; development buckets are `dev-` prefixed.
    pub fn for_environment(environment: &str) -> Self {
        let mut mapping = Self::default();
        if environment.eq_ignore_ascii_case(DEVELOPMENT_ENVIRONMENT) {
            for bucket in mapping.buckets.values_mut() {
                bucket.insert_str(0, "dev-");
            }
        }
        mapping
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Instrument, String)>,
    {
        Self {
            buckets: entries.into_iter().collect(),
        }
    }

    /// Parse a TOML override. Instruments left out of the file have no destination.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        #[derive(serde::Deserialize)]
        struct DestinationsFile {
            destinations: BTreeMap<String, String>,
        }
        let file: DestinationsFile = toml::from_str(s).context("parsing destinations toml")?;

        let mut buckets = BTreeMap::new();
        for (code, bucket) in file.destinations {
            let inst: Instrument = code.parse().map_err(|e: String| anyhow!(e))?;
            let bucket = bucket.trim();
            if bucket.is_empty() {
                bail!("empty bucket name for instrument '{code}'");
            }
            buckets.insert(inst, bucket.to_string());
        }
        if buckets.is_empty() {
            bail!("destinations table is empty");
        }
        Ok(Self { buckets })
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading destinations from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Override table from $SORTER_DESTINATIONS_PATH, else
    /// config/destinations.toml, else `None`.
    pub fn load_override() -> Result<Option<Self>> {
        if let Ok(p) = std::env::var(ENV_DESTINATIONS_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_DESTINATIONS_PATH} points to non-existent path");
            }
            return Self::load_from(&pb).map(Some);
        }
        let default_path = PathBuf::from(DEFAULT_DESTINATIONS_PATH);
        if default_path.exists() {
            return Self::load_from(&default_path).map(Some);
        }
        Ok(None)
    }

    /// Load the table using env var + fallbacks:
    /// 1) $SORTER_DESTINATIONS_PATH
    /// 2) config/destinations.toml
    /// 3) built-in table for `environment`
    pub fn load_default(environment: &str) -> Result<Self> {
        Ok(Self::load_override()?.unwrap_or_else(|| Self::for_environment(environment)))
    }

    pub fn resolve_instrument(&self, instrument: Instrument) -> Result<&str, SortError> {
        self.buckets
            .get(&instrument)
            .map(String::as_str)
            .ok_or_else(|| {
                SortError::UnknownInstrument(format!(
                    "no destination bucket configured for '{instrument}'"
                ))
            })
    }

    /// Resolve a raw instrument code such as "spani".
    pub fn resolve(&self, instrument_code: &str) -> Result<&str, SortError> {
        let instrument: Instrument = instrument_code
            .parse()
            .map_err(SortError::UnknownInstrument)?;
        self.resolve_instrument(instrument)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
