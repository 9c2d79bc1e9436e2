//! Run identifiers.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::prelude::*;

/// Prefix of every run directory name.
pub const RUN_ID_PREFIX: &str = "run-";

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Name of a run directory, e.g. `run-20240101T120000Z`.
///
/// A parsed `RunId` is only known to be well formed. Whether the run exists is decided by
/// the allowlist in [`crate::allowlist`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Parse a candidate identifier.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use gv_store::run_id::RunId;
    ///
    /// assert!(RunId::parse("run-20240101T120000Z").is_ok());
    /// assert!(RunId::parse("run-20240101T1200Z").is_err());
    /// ```
    pub fn parse(candidate: &str) -> Result<Self> {
        if is_well_formed(candidate) {
            Ok(Self(candidate.to_string()))
        } else {
            Err(Error::InvalidIdentifierSyntax)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time embedded in the identifier.
    ///
    /// `None` when the digits do not form a real date, e.g. month 13.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let digits = &self.0[RUN_ID_PREFIX.len()..];
        NaiveDateTime::parse_from_str(digits, TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// `run-` + `YYYYMMDD` + `T` + `HHMMSS` + `Z`.
pub fn is_well_formed(candidate: &str) -> bool {
    let Some(rest) = candidate.strip_prefix(RUN_ID_PREFIX) else {
        return false;
    };
    let bytes = rest.as_bytes();
    bytes.len() == 16
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[8] == b'T'
        && bytes[9..15].iter().all(u8::is_ascii_digit)
        && bytes[15] == b'Z'
}

impl FromStr for RunId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn lexical_pattern() {
        assert!(is_well_formed("run-20240101T120000Z"));
        assert!(is_well_formed("run-99999999T999999Z"));

        for candidate in [
            "",
            "run-",
            "20240101T120000Z",
            "RUN-20240101T120000Z",
            "run-20240101t120000Z",
            "run-20240101T120000z",
            "run-20240101T120000Z ",
            "run-2024010AT120000Z",
            "run-20240101T120000Z/..",
            "run-20240101T1200000Z",
            "run-٢٠٢٤0101T120000Z",
        ] {
            assert!(!is_well_formed(candidate), "{candidate:?}");
            assert!(matches!(
                RunId::parse(candidate),
                Err(Error::InvalidIdentifierSyntax)
            ));
        }
    }

    #[test]
    fn embedded_timestamp() {
        let run = RunId::parse("run-20240229T235959Z").unwrap();
        let ts = run.timestamp().unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 2, 29));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (23, 59, 59));

        assert!(RunId::parse("run-20241301T000000Z").unwrap().timestamp().is_none());
    }

    #[test]
    fn orders_by_time() {
        let older = RunId::parse("run-20231231T235959Z").unwrap();
        let newer = RunId::parse("run-20240101T000000Z").unwrap();
        assert!(older < newer);
    }
}
