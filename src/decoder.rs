//! Reading decoder.
//!
//! Each encoded reading is a JSON object of the form
//!
//! ```json
//! {"timestamp": 1740920170, "datetime": "Sun Mar 02 2025 12:56:10",
//!  "room": "kitchen", "nodeId": 6, "endpointId": 6,
//!  "attribute": {"RelativeHumidityMeasurement": {"MeasuredValue": 8614}}}
//! ```
//!
//! `timestamp`, `room` and `attribute` are required. The single key of
//! `attribute` is the sensor kind.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MalformedReading;
use crate::models::{RawReading, SensorKind};

// ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReading {
    timestamp: i64,
    #[serde(default)]
    datetime: String,
    room: String,
    #[serde(default)]
    node_id: i64,
    #[serde(default)]
    endpoint_id: i64,
    attribute: Map<String, Value>,
}

/// Decode one encoded reading.
///
/// An empty `attribute` mapping is not an error; the reading gets
/// [`SensorKind::Unknown`] and an empty payload.
pub fn decode(raw: &str) -> Result<RawReading, MalformedReading> {
    // ---
    let wire: WireReading = serde_json::from_str(raw)?;

    if wire.attribute.len() > 1 {
        return Err(MalformedReading::AmbiguousAttribute(wire.attribute.len()));
    }

    let (kind, payload) = match wire.attribute.into_iter().next() {
        None => (SensorKind::Unknown, Map::new()),
        Some((name, Value::Object(payload))) => (SensorKind::from_name(&name), payload),
        Some((name, Value::Null)) => (SensorKind::from_name(&name), Map::new()),
        Some((name, _)) => return Err(MalformedReading::PayloadNotObject { kind: name }),
    };

    Ok(RawReading {
        timestamp: wire.timestamp,
        datetime: wire.datetime,
        room: wire.room,
        node_id: wire.node_id,
        endpoint_id: wire.endpoint_id,
        kind,
        payload,
    })
}

/// Encode a reading back into the wire format accepted by [`decode`].
pub fn encode(reading: &RawReading) -> String {
    // ---
    let mut attribute = Map::new();
    if reading.kind != SensorKind::Unknown || !reading.payload.is_empty() {
        attribute.insert(
            reading.kind.as_str().to_string(),
            Value::Object(reading.payload.clone()),
        );
    }

    let wire = WireReading {
        timestamp: reading.timestamp,
        datetime: reading.datetime.clone(),
        room: reading.room.clone(),
        node_id: reading.node_id,
        endpoint_id: reading.endpoint_id,
        attribute,
    };

    // A struct of strings, integers and JSON maps always serializes.
    serde_json::to_string(&wire).unwrap_or_default()
}
