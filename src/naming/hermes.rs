// src/naming/hermes.rs
//! HERMES science filename grammar.
//!
//! Raw level 0 files:
//!   `hermes_<TARGET>_l0_<YYYYJJJ-HHMMSS>_v<NN>.bin`
//!   e.g. `hermes_SPANI_l0_2023040-000018_v01.bin`
//!
//! Processed files:
//!   `hermes_<short>_<level>[_test][_<mode>][_<descriptor>]_<YYYYMMDDTHHMMSS>_v<X.Y.Z>.cdf`
//!   e.g. `hermes_spn_l1_20230210T000018_v1.0.01.cdf`
//!   The timestamp may also be split as `<YYYYMMDD>_<HHMMSS>`.

use anyhow::{anyhow, bail, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::{DataLevel, NamingGrammar, ParsedIdentity};
use crate::instrument::Instrument;

pub const MISSION_NAME: &str = "hermes";

#[derive(Debug, Clone, Copy, Default)]
pub struct HermesGrammar;

impl NamingGrammar for HermesGrammar {
    fn parse(&self, filename: &str) -> Result<ParsedIdentity> {
        let filename = filename.trim();
        if filename.is_empty() {
            bail!("empty filename");
        }
        let (stem, ext) = filename
            .rsplit_once('.')
            .ok_or_else(|| anyhow!("missing file extension"))?;
        match ext {
            "bin" => parse_raw(stem),
            "cdf" => parse_processed(stem),
            other => bail!("file extension .{other} not recognized"),
        }
    }

    fn name(&self) -> &'static str {
        "hermes"
    }
}

/// Raw names may spell the mission in any case; processed names use lowercase.
fn check_mission(token: &str, any_case: bool) -> Result<()> {
    let matches = if any_case {
        token.eq_ignore_ascii_case(MISSION_NAME)
    } else {
        token == MISSION_NAME
    };
    if !matches {
        bail!("'{token}' is not a valid mission name");
    }
    Ok(())
}

fn parse_raw(stem: &str) -> Result<ParsedIdentity> {
    let tokens: Vec<&str> = stem.split('_').collect();
    let [mission, target, level, time, version] = tokens.as_slice() else {
        bail!("expected 5 tokens in a level 0 filename, found {}", tokens.len());
    };
    check_mission(mission, true)?;
    let instrument = Instrument::from_target_name(target)
        .ok_or_else(|| anyhow!("'{target}' is not a valid instrument target name"))?;
    if *level != "l0" {
        bail!("raw .bin files must be level l0, found '{level}'");
    }
    let timestamp = parse_ordinal_time(time)?;
    let version = version
        .strip_prefix('v')
        .filter(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()))
        .ok_or_else(|| anyhow!("bad version token '{version}'"))?;

    Ok(ParsedIdentity {
        instrument,
        level: DataLevel::L0,
        timestamp,
        version: version.to_string(),
        mode: None,
        descriptor: None,
        test: false,
    })
}

fn parse_processed(stem: &str) -> Result<ParsedIdentity> {
    let tokens: Vec<&str> = stem.split('_').collect();
    if tokens.len() < 5 {
        bail!("expected at least 5 tokens, found {}", tokens.len());
    }
    check_mission(tokens[0], false)?;
    let instrument = Instrument::from_short_name(tokens[1])
        .ok_or_else(|| anyhow!("'{}' is not a valid instrument short name", tokens[1]))?;
    let level = DataLevel::from_token(tokens[2])
        .ok_or_else(|| anyhow!("'{}' is not a data level", tokens[2]))?;
    if level == DataLevel::L0 {
        bail!("level l0 files are raw .bin files");
    }

    let last = tokens.len() - 1;
    let version = tokens[last]
        .strip_prefix('v')
        .filter(|v| is_dotted_version(v))
        .ok_or_else(|| anyhow!("bad version token '{}'", tokens[last]))?;

    // Timestamp is either one `YYYYMMDDTHHMMSS` token or `YYYYMMDD` `HHMMSS`.
    let (timestamp, time_start) = match parse_compact_time(tokens[last - 1]) {
        Ok(ts) => (ts, last - 1),
        Err(single_err) if last >= 4 => {
            let joined = format!("{}T{}", tokens[last - 2], tokens[last - 1]);
            let ts = parse_compact_time(&joined).map_err(|_| single_err)?;
            (ts, last - 2)
        }
        Err(e) => return Err(e),
    };
    if time_start < 3 {
        bail!("missing level or instrument tokens before the timestamp");
    }

    let mut extras = tokens[3..time_start].iter().copied();
    let mut next = extras.next();
    let test = next == Some("test");
    if test {
        next = extras.next();
    }
    let mode = next.map(str::to_string);
    let descriptor = extras.next().map(str::to_string);
    if let Some(extra) = extras.next() {
        bail!("unexpected token '{extra}'");
    }
    if mode.as_deref().is_some_and(str::is_empty) || descriptor.as_deref().is_some_and(str::is_empty) {
        bail!("empty token in filename");
    }

    Ok(ParsedIdentity {
        instrument,
        level,
        timestamp,
        version: version.to_string(),
        mode,
        descriptor,
        test,
    })
}

fn is_dotted_version(v: &str) -> bool {
    !v.is_empty()
        && v.split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

fn digits(s: &str) -> Result<u32> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        bail!("'{s}' is not numeric");
    }
    Ok(s.parse()?)
}

fn parse_hms(s: &str) -> Result<NaiveTime> {
    if s.len() != 6 || !s.is_ascii() {
        bail!("time '{s}' must be HHMMSS");
    }
    NaiveTime::from_hms_opt(digits(&s[0..2])?, digits(&s[2..4])?, digits(&s[4..6])?)
        .ok_or_else(|| anyhow!("time '{s}' out of range"))
}

/// `YYYYJJJ-HHMMSS` (day of year).
fn parse_ordinal_time(s: &str) -> Result<NaiveDateTime> {
    let (date, time) = s
        .split_once('-')
        .ok_or_else(|| anyhow!("timestamp '{s}' must be YYYYJJJ-HHMMSS"))?;
    if date.len() != 7 || !date.is_ascii() {
        bail!("date '{date}' must be YYYYJJJ");
    }
    let year = digits(&date[0..4])? as i32;
    let day = digits(&date[4..7])?;
    let date = NaiveDate::from_yo_opt(year, day)
        .ok_or_else(|| anyhow!("day of year {day} out of range for {year}"))?;
    Ok(date.and_time(parse_hms(time)?))
}

/// `YYYYMMDDTHHMMSS`.
fn parse_compact_time(s: &str) -> Result<NaiveDateTime> {
    let (date, time) = s
        .split_once('T')
        .ok_or_else(|| anyhow!("timestamp '{s}' must be YYYYMMDDTHHMMSS"))?;
    if date.len() != 8 || !date.is_ascii() {
        bail!("date '{date}' must be YYYYMMDD");
    }
    let date = NaiveDate::from_ymd_opt(
        digits(&date[0..4])? as i32,
        digits(&date[4..6])?,
        digits(&date[6..8])?,
    )
    .ok_or_else(|| anyhow!("date '{date}' out of range"))?;
    Ok(date.and_time(parse_hms(time)?))
}
