//! Timestamp normalization.
//!
//! The backing document store accumulated three timestamp encodings over the
//! life of the application: server timestamp objects, ISO-8601 strings, and
//! raw epoch milliseconds. Everything downstream (log ordering, conversation
//! sorting) compares timestamps, so all three are coerced into a single
//! [`DateTime<Utc>`] form at the read boundary.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A timestamp as it may appear in a stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredTimestamp {
    /// Server timestamp object with split seconds/nanoseconds fields.
    Server { seconds: i64, nanoseconds: u32 },

    /// Milliseconds since the Unix epoch.
    EpochMillis(i64),

    /// ISO-8601 / RFC 3339 string.
    Iso(String),
}

impl StoredTimestamp {
    /// Coerces the stored form into a comparable UTC datetime.
    ///
    /// Unparseable or out-of-range values fall back to the current time
    /// rather than erroring; a garbage timestamp must not break rendering.
    pub fn normalize(&self) -> DateTime<Utc> {
        match self {
            StoredTimestamp::Server {
                seconds,
                nanoseconds,
            } => Utc
                .timestamp_opt(*seconds, *nanoseconds)
                .single()
                .unwrap_or_else(Utc::now),
            StoredTimestamp::EpochMillis(millis) => Utc
                .timestamp_millis_opt(*millis)
                .single()
                .unwrap_or_else(Utc::now),
            StoredTimestamp::Iso(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }

    /// Normalizes an optional stored timestamp, defaulting missing values
    /// to the current time.
    pub fn normalize_or_now(value: Option<&StoredTimestamp>) -> DateTime<Utc> {
        value.map(StoredTimestamp::normalize).unwrap_or_else(Utc::now)
    }
}

impl From<DateTime<Utc>> for StoredTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        StoredTimestamp::EpochMillis(dt.timestamp_millis())
    }
}

/// Serde adapter for document timestamp fields.
///
/// Writes the ISO form; reads any of the three stored encodings through
/// [`StoredTimestamp::normalize`], so documents persisted under the older
/// encodings still load. Use as `#[serde(with = "stored_datetime")]`.
pub mod stored_datetime {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::StoredTimestamp;

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        dt.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(StoredTimestamp::deserialize(deserializer)?.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_epoch_millis() {
        let ts = StoredTimestamp::EpochMillis(1_700_000_000_000);
        assert_eq!(ts.normalize().timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn normalizes_iso_string() {
        let ts = StoredTimestamp::Iso("2024-03-01T12:30:00Z".to_string());
        let dt = ts.normalize();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T12:30:00+00:00");
    }

    #[test]
    fn normalizes_server_timestamp() {
        let ts = StoredTimestamp::Server {
            seconds: 1_700_000_000,
            nanoseconds: 500_000_000,
        };
        let dt = ts.normalize();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn garbage_iso_falls_back_to_now() {
        let before = Utc::now();
        let dt = StoredTimestamp::Iso("not a date".to_string()).normalize();
        assert!(dt >= before);
    }

    #[test]
    fn missing_value_falls_back_to_now() {
        let before = Utc::now();
        let dt = StoredTimestamp::normalize_or_now(None);
        assert!(dt >= before);
    }

    #[test]
    fn all_forms_are_mutually_comparable() {
        let millis = StoredTimestamp::EpochMillis(1_700_000_001_000).normalize();
        let iso = StoredTimestamp::Iso("2023-11-14T22:13:20Z".to_string()).normalize();
        let server = StoredTimestamp::Server {
            seconds: 1_700_000_002,
            nanoseconds: 0,
        }
        .normalize();

        // 2023-11-14T22:13:20Z == 1_700_000_000 seconds
        assert!(iso < millis);
        assert!(millis < server);
    }

    #[test]
    fn adapter_reads_every_form_and_writes_iso() {
        #[derive(Serialize, Deserialize)]
        struct Doc {
            #[serde(with = "stored_datetime")]
            at: DateTime<Utc>,
        }

        for raw in [
            r#"{"at": 1700000000000}"#,
            r#"{"at": "2023-11-14T22:13:20Z"}"#,
            r#"{"at": {"seconds": 1700000000, "nanoseconds": 0}}"#,
        ] {
            let doc: Doc = serde_json::from_str(raw).unwrap();
            assert_eq!(doc.at.timestamp(), 1_700_000_000);
        }

        let doc: Doc = serde_json::from_str(r#"{"at": 1700000000000}"#).unwrap();
        let written = serde_json::to_value(&doc).unwrap();
        assert!(written["at"].is_string());
    }

    #[test]
    fn deserializes_each_wire_form() {
        let millis: StoredTimestamp = serde_json::from_str("1700000000000").unwrap();
        assert_eq!(millis, StoredTimestamp::EpochMillis(1_700_000_000_000));

        let iso: StoredTimestamp = serde_json::from_str("\"2024-03-01T12:30:00Z\"").unwrap();
        assert!(matches!(iso, StoredTimestamp::Iso(_)));

        let server: StoredTimestamp =
            serde_json::from_str(r#"{"seconds": 1700000000, "nanoseconds": 0}"#).unwrap();
        assert!(matches!(server, StoredTimestamp::Server { .. }));
    }
}
