//! Timestamp (de)serialization for stored entities.
//!
//! Written as RFC 3339 text. Read back from RFC 3339 or from a Unix
//! timestamp in seconds or milliseconds, so rows imported from other tools
//! still decode.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Values above this are taken as milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl RawTimestamp {
    fn into_datetime(self) -> Result<DateTime<Utc>, String> {
        match self {
            Self::Text(s) => parse_rfc3339(&s),
            Self::Signed(ts) => from_unix(ts).ok_or_else(|| format!("Invalid Unix timestamp: {ts}")),
            Self::Unsigned(ts) => i64::try_from(ts)
                .ok()
                .and_then(from_unix)
                .ok_or_else(|| format!("Invalid Unix timestamp: {ts}")),
        }
    }
}

/// Format a timestamp the way it is stored.
#[must_use]
pub fn to_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored RFC 3339 timestamp.
pub fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid RFC3339 timestamp '{s}': {e}"))
}

fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    if ts > MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(ts)
    } else {
        DateTime::from_timestamp(ts, 0)
    }
}

pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_rfc3339(dt))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    RawTimestamp::deserialize(deserializer)?
        .into_datetime()
        .map_err(serde::de::Error::custom)
}

/// Same encoding for `Option<DateTime<Utc>>`, `None` as `null`.
pub mod option {
    use super::{to_rfc3339, DateTime, Deserialize, Deserializer, RawTimestamp, Serializer, Utc};

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dt {
            Some(dt) => serializer.serialize_some(&to_rfc3339(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<RawTimestamp>::deserialize(deserializer)?
            .map(RawTimestamp::into_datetime)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
