// src/naming/mod.rs
//! Identifier parsing: turn an object key into a [`ParsedIdentity`].
//!
//! The filename grammar itself is shared with the rest of the pipeline and is
//! plugged in through [`NamingGrammar`]; this module only adapts object keys to
//! it and maps every grammar failure to [`SortError::MalformedFilename`].

pub mod hermes;

use std::fmt;

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::SortError;
use crate::instrument::Instrument;

pub use hermes::HermesGrammar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataLevel {
    L0,
    Ql,
    L1,
    L2,
    L3,
    L4,
}

impl DataLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DataLevel::L0 => "l0",
            DataLevel::Ql => "ql",
            DataLevel::L1 => "l1",
            DataLevel::L2 => "l2",
            DataLevel::L3 => "l3",
            DataLevel::L4 => "l4",
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "l0" => Some(DataLevel::L0),
            "ql" => Some(DataLevel::Ql),
            "l1" => Some(DataLevel::L1),
            "l2" => Some(DataLevel::L2),
            "l3" => Some(DataLevel::L3),
            "l4" => Some(DataLevel::L4),
            _ => None,
        }
    }
}

impl fmt::Display for DataLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata encoded in a science filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedIdentity {
    pub instrument: Instrument,
    pub level: DataLevel,
    pub timestamp: NaiveDateTime,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
    #[serde(default)]
    pub test: bool,
}

/// A filename grammar. Implementations must not panic on arbitrary input.
pub trait NamingGrammar: Send + Sync {
    fn parse(&self, filename: &str) -> Result<ParsedIdentity>;
    fn name(&self) -> &'static str;
}

/// Parse the filename part of an object key with `grammar`.
pub fn parse_identity(grammar: &dyn NamingGrammar, key: &str) -> Result<ParsedIdentity, SortError> {
    let filename = file_name(key);
    grammar.parse(filename).map_err(|e| {
        SortError::MalformedFilename(format!("{filename:?} rejected by {}: {e:#}", grammar.name()))
    })
}

/// Last path segment of an object key.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
