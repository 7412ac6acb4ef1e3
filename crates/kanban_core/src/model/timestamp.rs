//! Millisecond-precision UTC timestamps.
//!
//! Persisted values use the ISO-8601 shape produced by JSON date
//! stringification (`2024-01-02T03:04:05.678Z`). In-memory values are
//! truncated to the same precision so a read-back compares equal.

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeDelta, Utc};

/// UTC instant with millisecond precision.
pub type Timestamp = DateTime<Utc>;

/// Returns the current time truncated to milliseconds.
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(3)
}

/// Returns a timestamp strictly after `previous`.
///
/// Uses the wall clock when it has advanced, otherwise `previous + 1ms`.
pub fn advance(previous: Timestamp) -> Timestamp {
    let current = now();
    if current > previous {
        current
    } else {
        previous + TimeDelta::milliseconds(1)
    }
}

/// Serde adapter for [`Timestamp`] fields.
pub mod iso_millis {
    use super::Timestamp;
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Timestamp, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(raw.as_str())
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|err| serde::de::Error::custom(format!("invalid timestamp `{raw}`: {err}")))
    }
}

/// Formats a timestamp the way it is persisted.
pub fn to_iso_string(value: Timestamp) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
