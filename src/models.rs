//! Data models shared by the decoder, the situation store and the aggregators.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::anomaly::Severity;

// ---

/// Stable identity of a situation, derived from its immutable content.
pub type SituationId = Uuid;

/// Normal/anomalous classification attached to a situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Normal,
    Anomalous,
}

impl Label {
    // ---
    pub fn is_anomalous(self) -> bool {
        self == Label::Anomalous
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Normal => "normal",
            Label::Anomalous => "anomalous",
        }
    }
}

/// Situation body as produced by the upstream detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationBody {
    // ---
    pub situation_description: String,
    /// Detector's own classification, kept verbatim.
    #[serde(default)]
    pub result: String,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    /// Encoded readings, decodable by [`crate::decoder::decode`].
    #[serde(default)]
    pub details: Vec<String>,
}

/// One entry of the ingestion interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationRecord {
    // ---
    pub situation: SituationBody,
    /// Current label. This is the only field reviewers can change.
    pub estimate: Label,
    #[serde(
        default,
        deserialize_with = "lenient_severity",
        skip_serializing_if = "Option::is_none"
    )]
    pub severity: Option<Severity>,
    #[serde(
        default,
        deserialize_with = "lenient_confidence",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<u8>,
}

/// Severity as sent by the detector. Matching ignores case; anything else is
/// treated as absent so the situation itself is kept.
fn lenient_severity<'de, D>(deserializer: D) -> Result<Option<Severity>, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    let Some(value) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let parsed = value
        .as_str()
        .map(|s| Value::String(s.trim().to_ascii_lowercase()))
        .and_then(|v| serde_json::from_value::<Severity>(v).ok());
    if parsed.is_none() {
        debug!("Ignoring unrecognized severity {}", value);
    }
    Ok(parsed)
}

/// Detection confidence in percent. Fractional values are rounded and the
/// result is clamped to 0..=100; non-numeric values are treated as absent.
fn lenient_confidence<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    let Some(value) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let number = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite());

    match number {
        Some(n) => Ok(Some(n.round().clamp(0.0, 100.0) as u8)),
        None => {
            debug!("Ignoring non-numeric confidence {}", value);
            Ok(None)
        }
    }
}

/// A situation held by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Situation {
    // ---
    pub id: SituationId,
    #[serde(flatten)]
    pub record: SituationRecord,
}

impl Situation {
    // ---
    pub fn label(&self) -> Label {
        self.record.estimate
    }

    pub fn description(&self) -> &str {
        &self.record.situation.situation_description
    }

    pub fn window_start(&self) -> i64 {
        self.record.situation.start_timestamp
    }

    pub fn window_end(&self) -> i64 {
        self.record.situation.end_timestamp
    }

    pub fn details(&self) -> &[String] {
        &self.record.situation.details
    }
}

// ---

/// Sensor attribute kind carried by a reading.
///
/// Known kinds get their own variant; any other well-formed name is kept as
/// [`SensorKind::Other`] so it still round-trips. A reading whose attribute
/// mapping is empty has kind [`SensorKind::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SensorKind {
    RelativeHumidity,
    Temperature,
    Occupancy,
    OnOff,
    Flow,
    Other(String),
    Unknown,
}

impl SensorKind {
    // ---
    pub const UNKNOWN: &'static str = "unknown";

    pub fn from_name(name: &str) -> Self {
        match name {
            "RelativeHumidityMeasurement" => SensorKind::RelativeHumidity,
            "TemperatureMeasurement" => SensorKind::Temperature,
            "OccupancySensing" => SensorKind::Occupancy,
            "OnOff" => SensorKind::OnOff,
            "FlowMeasurement" => SensorKind::Flow,
            Self::UNKNOWN => SensorKind::Unknown,
            other => SensorKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SensorKind::RelativeHumidity => "RelativeHumidityMeasurement",
            SensorKind::Temperature => "TemperatureMeasurement",
            SensorKind::Occupancy => "OccupancySensing",
            SensorKind::OnOff => "OnOff",
            SensorKind::Flow => "FlowMeasurement",
            SensorKind::Other(name) => name,
            SensorKind::Unknown => Self::UNKNOWN,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SensorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A decoded sensor event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReading {
    // ---
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Human-readable timestamp as recorded by the hub.
    pub datetime: String,
    pub room: String,
    pub node_id: i64,
    pub endpoint_id: i64,
    pub kind: SensorKind,
    /// Attribute payload in wire order, e.g. `{"MeasuredValue": 8614}`.
    pub payload: Map<String, Value>,
}

impl RawReading {
    /// Scalar reading: the first payload entry as a number.
    ///
    /// Booleans count as 1/0. An empty payload or a non-numeric first entry
    /// yields 0.
    pub fn value(&self) -> f64 {
        // ---
        match self.payload.values().next() {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::Bool(b)) => f64::from(u8::from(*b)),
            _ => 0.0,
        }
    }
}

// ---

/// Output unit of the time-series extractor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub timestamp: i64,
    pub datetime: String,
    pub value: f64,
    pub room: String,
    pub is_anomalous: bool,
}

/// Activity counts for one room during one hour of the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityBucket {
    pub room: String,
    pub hour: u8,
    pub activity_count: u32,
    pub anomaly_count: u32,
}

/// Normal vs anomalous statistics for one sensor kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub kind_name: String,
    pub normal_average: f64,
    pub anomalous_average: f64,
    pub normal_sample_count: u32,
    pub anomalous_sample_count: u32,
}
