//! Latest-known reading per sensor kind.

use std::collections::BTreeMap;

use crate::models::{RawReading, Situation};

use super::readings;

// ---

/// Keep, for every kind name, the reading with the greatest timestamp.
///
/// Replacement uses strict `<`, so on a timestamp tie the reading seen first
/// in store order wins. Readings with an empty attribute mapping are kept
/// under `"unknown"`.
pub fn latest_by_kind(situations: &[Situation]) -> BTreeMap<String, RawReading> {
    // ---
    let mut latest: BTreeMap<String, RawReading> = BTreeMap::new();

    for (_, reading) in readings(situations) {
        match latest.get(reading.kind.as_str()) {
            Some(current) if current.timestamp >= reading.timestamp => {}
            _ => {
                latest.insert(reading.kind.as_str().to_string(), reading);
            }
        }
    }

    latest
}

#[cfg(test)]
mod tests {
    // ---
    use super::super::fixtures::*;
    use super::*;
    use crate::models::Label;

    #[test]
    fn test_keeps_greatest_timestamp_per_kind() {
        // ---
        let situations = vec![
            situation(
                1,
                Label::Normal,
                vec![humidity(300, "kitchen", 1), reading(50, "hall", "OnOff", 1)],
            ),
            situation(
                2,
                Label::Anomalous,
                vec![humidity(100, "bath", 2), reading(60, "hall", "OnOff", 0)],
            ),
        ];

        let latest = latest_by_kind(&situations);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["RelativeHumidityMeasurement"].timestamp, 300);
        assert_eq!(latest["RelativeHumidityMeasurement"].room, "kitchen");
        assert_eq!(latest["OnOff"].timestamp, 60);
    }

    #[test]
    fn test_timestamp_tie_keeps_first_seen() {
        // ---
        let situations = vec![
            situation(1, Label::Normal, vec![humidity(500, "kitchen", 1111)]),
            situation(2, Label::Normal, vec![humidity(500, "bedroom", 2222)]),
        ];

        let latest = latest_by_kind(&situations);
        assert_eq!(latest["RelativeHumidityMeasurement"].room, "kitchen");
        assert_eq!(latest["RelativeHumidityMeasurement"].value(), 1111.0);
    }

    #[test]
    fn test_unknown_kind_bucket() {
        // ---
        let situations = vec![situation(
            1,
            Label::Normal,
            vec![
                r#"{"timestamp": 10, "room": "attic", "attribute": {}}"#.to_string(),
                r#"{"timestamp": 20, "room": "cellar", "attribute": {}}"#.to_string(),
                "not a reading".to_string(),
            ],
        )];

        let latest = latest_by_kind(&situations);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest["unknown"].room, "cellar");
    }

    #[test]
    fn test_idempotent() {
        // ---
        let situations = kitchen_pair();
        assert_eq!(latest_by_kind(&situations), latest_by_kind(&situations));
    }

    #[test]
    fn test_empty_input() {
        // ---
        assert!(latest_by_kind(&[]).is_empty());
    }
}
