//! Presentation metadata per sensor kind.
//!
//! Kept apart from the aggregators: they work on raw scalar values and never
//! consult this table.

use serde::Serialize;

use crate::models::{RawReading, SensorKind};

// ---

/// Display metadata for one kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KindInfo {
    pub label: &'static str,
    /// Unit of the scaled value; empty for state sensors.
    pub unit: &'static str,
    /// Raw values are divided by this before display.
    pub divisor: f64,
    /// `true` for sensors whose value is a 0/1 state.
    pub binary: bool,
}

const GENERIC: KindInfo = KindInfo {
    label: "Sensor",
    unit: "",
    divisor: 1.0,
    binary: false,
};

pub fn info(kind: &SensorKind) -> KindInfo {
    // ---
    match kind {
        SensorKind::RelativeHumidity => KindInfo {
            label: "Humidity",
            unit: "%",
            divisor: 100.0,
            binary: false,
        },
        SensorKind::Temperature => KindInfo {
            label: "Temperature",
            unit: "°C",
            divisor: 100.0,
            binary: false,
        },
        SensorKind::Occupancy => KindInfo {
            label: "Occupancy",
            binary: true,
            ..GENERIC
        },
        SensorKind::OnOff => KindInfo {
            label: "Power Status",
            binary: true,
            ..GENERIC
        },
        SensorKind::Flow => KindInfo {
            label: "Water Flow",
            unit: "ml/min",
            ..GENERIC
        },
        SensorKind::Other(_) | SensorKind::Unknown => GENERIC,
    }
}

/// Human-readable rendering of a reading's value, e.g. `86.14%` or `Occupied`.
pub fn display_value(reading: &RawReading) -> String {
    // ---
    let value = reading.value();
    match &reading.kind {
        SensorKind::Occupancy => state_text(value, "Occupied", "Unoccupied"),
        SensorKind::OnOff => state_text(value, "On", "Off"),
        SensorKind::RelativeHumidity | SensorKind::Temperature => {
            let meta = info(&reading.kind);
            format!("{:.2}{}", value / meta.divisor, meta.unit)
        }
        SensorKind::Flow => format!("{value} ml/min"),
        SensorKind::Other(_) | SensorKind::Unknown => {
            serde_json::Value::Object(reading.payload.clone()).to_string()
        }
    }
}

fn state_text(value: f64, on: &str, off: &str) -> String {
    let text = if value != 0.0 { on } else { off };
    text.to_string()
}
