// Telemetry data domain models
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One channel value inside a reading. `None` means the sensor dropped out.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelValue {
    pub name: String,
    pub value: Option<f64>,
}

/// A single timestamped reading. Channels keep the order they appeared in
/// on the wire, which is the discovery order used for chart options.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub timestamp: DateTime<Utc>,
    pub channels: Vec<ChannelValue>,
}

impl SensorReading {
    pub fn new(timestamp: DateTime<Utc>, channels: Vec<ChannelValue>) -> Self {
        Self {
            timestamp,
            channels,
        }
    }

    pub fn value(&self, channel: &str) -> Option<f64> {
        self.channels
            .iter()
            .find(|c| c.name == channel)
            .and_then(|c| c.value)
    }
}

/// Readings in ascending timestamp order. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSeries {
    pub readings: Vec<SensorReading>,
}

impl TimeSeries {
    pub fn new(readings: Vec<SensorReading>) -> Self {
        Self { readings }
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Channel names of the first reading, or nothing for an empty series.
    pub fn channel_names(&self) -> Vec<&str> {
        match self.readings.first() {
            Some(first) => first.channels.iter().map(|c| c.name.as_str()).collect(),
            None => Vec::new(),
        }
    }

    /// Every non-null value of every channel of every reading.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.readings
            .iter()
            .flat_map(|r| r.channels.iter().filter_map(|c| c.value))
    }

    pub fn latest(&self) -> Option<&SensorReading> {
        self.readings.last()
    }
}

/// Ambient temperature sample used to augment the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbientTemperature {
    pub temperature: f64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Server-side aggregation window. Empty means "use the server default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AveragingWindow(Option<TimeDelta>);

impl AveragingWindow {
    pub fn server_default() -> Self {
        Self(None)
    }

    /// Returns `None` for zero or negative durations.
    pub fn new(window: TimeDelta) -> Option<Self> {
        (window > TimeDelta::zero()).then_some(Self(Some(window)))
    }

    pub fn from_secs(secs: i64) -> Option<Self> {
        Self::new(TimeDelta::seconds(secs))
    }

    /// ISO 8601 duration, or an empty string for the server default.
    pub fn query_value(&self) -> String {
        self.0.map(|d| d.to_string()).unwrap_or_default()
    }
}

/// Parse an ISO 8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
}

impl Serialize for SensorReading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.channels.len() + 1))?;
        map.serialize_entry("timestamp", &self.timestamp)?;
        for channel in &self.channels {
            map.serialize_entry(&channel.name, &channel.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SensorReading {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ReadingVisitor;

        impl<'de> Visitor<'de> for ReadingVisitor {
            type Value = SensorReading;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object with a timestamp and numeric channel values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SensorReading, A::Error> {
                let mut timestamp = None;
                let mut channels = Vec::new();

                while let Some(key) = map.next_key::<String>()? {
                    if key == "timestamp" {
                        let raw: String = map.next_value()?;
                        let parsed = parse_timestamp(&raw).ok_or_else(|| {
                            <A::Error as de::Error>::custom(format!("invalid timestamp: {raw}"))
                        })?;
                        timestamp = Some(parsed);
                    } else {
                        let value: Option<f64> = map.next_value()?;
                        channels.push(ChannelValue { name: key, value });
                    }
                }

                let timestamp = timestamp.ok_or_else(|| <A::Error as de::Error>::missing_field("timestamp"))?;
                Ok(SensorReading::new(timestamp, channels))
            }
        }

        deserializer.deserialize_map(ReadingVisitor)
    }
}
