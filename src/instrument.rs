// src/instrument.rs
//! The closed set of HERMES instruments and the names each one goes by.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Eea,
    Nemisis,
    Merit,
    Spani,
}

impl Instrument {
    pub const ALL: [Instrument; 4] = [
        Instrument::Eea,
        Instrument::Nemisis,
        Instrument::Merit,
        Instrument::Spani,
    ];

    /// Routing code, e.g. "spani".
    pub fn code(self) -> &'static str {
        match self {
            Instrument::Eea => "eea",
            Instrument::Nemisis => "nemisis",
            Instrument::Merit => "merit",
            Instrument::Spani => "spani",
        }
    }

    /// Abbreviation used in processed (`.cdf`) filenames.
    pub fn short_name(self) -> &'static str {
        match self {
            Instrument::Eea => "eea",
            Instrument::Nemisis => "nem",
            Instrument::Merit => "mrt",
            Instrument::Spani => "spn",
        }
    }

    /// Upper-case token used in raw level 0 (`.bin`) filenames.
    pub fn target_name(self) -> &'static str {
        match self {
            Instrument::Eea => "EEA",
            Instrument::Nemisis => "NEM",
            Instrument::Merit => "MERIT",
            Instrument::Spani => "SPANI",
        }
    }

    pub fn from_short_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.short_name() == s)
    }

    pub fn from_target_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.target_name() == s)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Instrument {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|i| i.code() == lower)
            .ok_or_else(|| format!("'{s}' is not a HERMES instrument"))
    }
}
