// src/common/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Readings ---

/// A single physical measurement. Serialized as the `data` object of an
/// output line: `{"temp": ..}` or `{"temp": .., "hum": ..}`.
///
/// `Humidity` is listed first so untagged decoding tries the wider shape
/// before falling back to temperature-only.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Humidity {
        #[serde(rename = "temp")]
        celsius: f32,
        #[serde(rename = "hum")]
        percent: f32,
    },
    Temperature {
        #[serde(rename = "temp")]
        celsius: f32,
    },
}

impl Reading {
    pub fn celsius(&self) -> f32 {
        match *self {
            Reading::Humidity { celsius, .. } | Reading::Temperature { celsius } => celsius,
        }
    }

    pub fn humidity(&self) -> Option<f32> {
        match *self {
            Reading::Humidity { percent, .. } => Some(percent),
            Reading::Temperature { .. } => None,
        }
    }
}

/// One output record: a reading stamped with the time it was taken and the
/// name of the sensor that took it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampedReading {
    #[serde(rename = "datetime", with = "rfc3339_nanos")]
    pub time: DateTime<Utc>,
    #[serde(rename = "sensor")]
    pub sensor_name: String,
    #[serde(rename = "data")]
    pub reading: Reading,
}

impl TimestampedReading {
    /// Stamps `reading` with the current UTC time.
    pub fn now(sensor_name: &str, reading: Reading) -> Self {
        TimestampedReading {
            time: Utc::now(),
            sensor_name: sensor_name.to_owned(),
            reading,
        }
    }

    /// Serializes to a single JSON line (no trailing newline).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// RFC 3339 with nanosecond precision and a `Z` suffix.
mod rfc3339_nanos {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 14, 15, 9, 26).unwrap() + chrono::Duration::nanoseconds(535_897_932)
    }

    #[test]
    fn test_temperature_line_format() {
        let r = TimestampedReading {
            time: fixed_time(),
            sensor_name: "bread-board".into(),
            reading: Reading::Temperature { celsius: 23.5 },
        };
        assert_eq!(
            r.to_json().unwrap(),
            r#"{"datetime":"2021-03-14T15:09:26.535897932Z","sensor":"bread-board","data":{"temp":23.5}}"#
        );
    }

    #[test]
    fn test_humidity_line_format() {
        let r = TimestampedReading {
            time: fixed_time(),
            sensor_name: "chamber".into(),
            reading: Reading::Humidity { celsius: 21.25, percent: 40.5 },
        };
        assert_eq!(
            r.to_json().unwrap(),
            r#"{"datetime":"2021-03-14T15:09:26.535897932Z","sensor":"chamber","data":{"temp":21.25,"hum":40.5}}"#
        );
    }

    #[test]
    fn test_parse_back_preserves_fields() {
        let original = TimestampedReading {
            time: fixed_time(),
            sensor_name: "EDFA-back".into(),
            reading: Reading::Humidity { celsius: -12.375, percent: 87.5 },
        };
        let parsed = TimestampedReading::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parsed.reading.celsius(), -12.375);
        assert_eq!(parsed.reading.humidity(), Some(87.5));

        let temp_only = TimestampedReading {
            time: fixed_time(),
            sensor_name: "beacon".into(),
            reading: Reading::Temperature { celsius: -0.0625 },
        };
        let parsed = TimestampedReading::from_json(&temp_only.to_json().unwrap()).unwrap();
        assert_eq!(parsed, temp_only);
        assert_eq!(parsed.reading.humidity(), None);
    }

    #[test]
    fn test_parse_rejects_bad_timestamp() {
        let line = r#"{"datetime":"yesterday","sensor":"x","data":{"temp":1.0}}"#;
        assert!(TimestampedReading::from_json(line).is_err());
    }
}
