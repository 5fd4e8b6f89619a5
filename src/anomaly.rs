//! Anomaly records for the human review workflow.
//!
//! Records are derived fresh from the anomalous situations in a snapshot.
//! Reviewer state (status and notes) lives outside the records in an
//! id-keyed map and is overlaid by [`reconcile`], so re-deriving never
//! resets a review.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decoder::decode;
use crate::models::{Label, Situation, SituationId};

// ---

/// Confidence reported when the upstream record does not carry one.
pub const DEFAULT_CONFIDENCE: u8 = 75;

/// Room reported when no reading of the situation names one.
pub const UNKNOWN_ROOM: &str = "unknown";

const ANOMALY_NAMESPACE: Uuid = Uuid::from_u128(0x6a1c_3f52_9d7e_4b08_a1e4_77c0_2b9d_51e3);

pub type AnomalyId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Reviewed,
    Dismissed,
    Escalated,
}

impl ReviewStatus {
    // ---
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Reviewed => "reviewed",
            ReviewStatus::Dismissed => "dismissed",
            ReviewStatus::Escalated => "escalated",
        }
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "reviewed" => Ok(ReviewStatus::Reviewed),
            "dismissed" => Ok(ReviewStatus::Dismissed),
            "escalated" => Ok(ReviewStatus::Escalated),
            other => Err(format!("unknown review status '{other}'")),
        }
    }
}

/// Reviewer-owned part of an anomaly record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReviewState {
    pub status: ReviewStatus,
    pub notes: Option<String>,
}

impl ReviewState {
    /// Apply a review action. Notes are only replaced when provided.
    pub fn apply(&mut self, status: ReviewStatus, notes: Option<String>) {
        // ---
        self.status = status;
        if notes.is_some() {
            self.notes = notes;
        }
    }
}

/// Review-workflow entity derived from one anomalous situation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyRecord {
    // ---
    pub id: AnomalyId,
    /// Weak reference to the originating situation.
    pub situation_id: SituationId,
    /// End of the situation window.
    pub timestamp: i64,
    pub description: String,
    pub severity: Severity,
    pub review_status: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
    pub related_sensor_kinds: Vec<String>,
    pub room_location: String,
    /// 0 to 100.
    pub detection_confidence: u8,
    pub estimate: Label,
}

/// Anomaly id for a situation. Stable for as long as the situation id is.
pub fn anomaly_id(situation_id: SituationId) -> AnomalyId {
    Uuid::new_v5(&ANOMALY_NAMESPACE, situation_id.as_bytes())
}

/// Derive one pending record per anomalous situation, in store order.
pub fn derive(situations: &[Situation]) -> Vec<AnomalyRecord> {
    // ---
    situations
        .iter()
        .filter(|s| s.label().is_anomalous())
        .map(derive_one)
        .collect()
}

fn derive_one(situation: &Situation) -> AnomalyRecord {
    // ---
    let mut kinds: Vec<String> = Vec::new();
    let mut room: Option<String> = None;

    for reading in situation.details().iter().filter_map(|raw| decode(raw).ok()) {
        if room.is_none() && !reading.room.is_empty() {
            room = Some(reading.room.clone());
        }
        let name = reading.kind.as_str();
        if !kinds.iter().any(|k| k == name) {
            kinds.push(name.to_string());
        }
    }

    AnomalyRecord {
        id: anomaly_id(situation.id),
        situation_id: situation.id,
        timestamp: situation.window_end(),
        description: situation.description().to_string(),
        severity: situation.record.severity.unwrap_or_default(),
        review_status: ReviewStatus::Pending,
        review_notes: None,
        related_sensor_kinds: kinds,
        room_location: room.unwrap_or_else(|| UNKNOWN_ROOM.to_string()),
        detection_confidence: situation
            .record
            .confidence
            .map_or(DEFAULT_CONFIDENCE, |c| c.min(100)),
        estimate: situation.label(),
    }
}

/// Overlay stored reviewer state onto freshly derived records, matched by id.
pub fn reconcile(
    mut records: Vec<AnomalyRecord>,
    reviews: &HashMap<AnomalyId, ReviewState>,
) -> Vec<AnomalyRecord> {
    // ---
    for record in &mut records {
        if let Some(review) = reviews.get(&record.id) {
            record.review_status = review.status;
            record.review_notes = review.notes.clone();
        }
    }
    records
}

pub fn filter_by_status(
    records: Vec<AnomalyRecord>,
    status: Option<ReviewStatus>,
) -> Vec<AnomalyRecord> {
    match status {
        Some(status) => records
            .into_iter()
            .filter(|r| r.review_status == status)
            .collect(),
        None => records,
    }
}

pub fn filter_by_severity(
    records: Vec<AnomalyRecord>,
    severity: Option<Severity>,
) -> Vec<AnomalyRecord> {
    match severity {
        Some(severity) => records
            .into_iter()
            .filter(|r| r.severity == severity)
            .collect(),
        None => records,
    }
}

pub fn count_pending(records: &[AnomalyRecord]) -> usize {
    records
        .iter()
        .filter(|r| r.review_status == ReviewStatus::Pending)
        .count()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{SituationBody, SituationRecord};

    fn situation(n: u128, label: Label, details: &[&str]) -> Situation {
        // ---
        Situation {
            id: Uuid::from_u128(n),
            record: SituationRecord {
                situation: SituationBody {
                    situation_description: format!("situation {n}"),
                    result: label.as_str().to_string(),
                    start_timestamp: 100,
                    end_timestamp: 400,
                    details: details.iter().map(|d| d.to_string()).collect(),
                },
                estimate: label,
                severity: None,
                confidence: None,
            },
        }
    }

    const TEMP: &str = r#"{"timestamp": 100, "room": "bathroom", "attribute": {"TemperatureMeasurement": {"MeasuredValue": 2200}}}"#;
    const HUMID: &str = r#"{"timestamp": 200, "room": "kitchen", "attribute": {"RelativeHumidityMeasurement": {"MeasuredValue": 5390}}}"#;

    #[test]
    fn test_derive_only_anomalous() {
        // ---
        let situations = vec![
            situation(1, Label::Normal, &[TEMP]),
            situation(2, Label::Anomalous, &[TEMP, HUMID, TEMP]),
        ];
        let records = derive(&situations);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, anomaly_id(Uuid::from_u128(2)));
        assert_eq!(record.situation_id, Uuid::from_u128(2));
        assert_eq!(record.timestamp, 400);
        assert_eq!(record.severity, Severity::Medium);
        assert_eq!(record.review_status, ReviewStatus::Pending);
        assert_eq!(record.detection_confidence, DEFAULT_CONFIDENCE);
        assert_eq!(record.room_location, "bathroom");
        assert_eq!(
            record.related_sensor_kinds,
            vec!["TemperatureMeasurement", "RelativeHumidityMeasurement"]
        );
    }

    #[test]
    fn test_room_falls_back_to_unknown() {
        // ---
        let records = derive(&[situation(3, Label::Anomalous, &["garbage"])]);
        assert_eq!(records[0].room_location, UNKNOWN_ROOM);
        assert!(records[0].related_sensor_kinds.is_empty());
    }

    #[test]
    fn test_external_severity_and_confidence() {
        // ---
        let mut s = situation(4, Label::Anomalous, &[TEMP]);
        s.record.severity = Some(Severity::Critical);
        s.record.confidence = Some(250);

        let records = derive(&[s]);
        assert_eq!(records[0].severity, Severity::Critical);
        assert_eq!(records[0].detection_confidence, 100);
    }

    #[test]
    fn test_reconcile_overlays_review_state() {
        // ---
        let situations = vec![
            situation(5, Label::Anomalous, &[TEMP]),
            situation(6, Label::Anomalous, &[HUMID]),
        ];
        let mut reviews = HashMap::new();
        reviews.insert(
            anomaly_id(Uuid::from_u128(6)),
            ReviewState {
                status: ReviewStatus::Escalated,
                notes: Some("called family".to_string()),
            },
        );

        let records = reconcile(derive(&situations), &reviews);
        assert_eq!(records[0].review_status, ReviewStatus::Pending);
        assert_eq!(records[1].review_status, ReviewStatus::Escalated);
        assert_eq!(records[1].review_notes.as_deref(), Some("called family"));
        assert_eq!(count_pending(&records), 1);
    }

    #[test]
    fn test_review_apply_keeps_notes_when_absent() {
        // ---
        let mut state = ReviewState::default();
        state.apply(ReviewStatus::Reviewed, Some("checked".to_string()));
        state.apply(ReviewStatus::Dismissed, None);

        assert_eq!(state.status, ReviewStatus::Dismissed);
        assert_eq!(state.notes.as_deref(), Some("checked"));
    }

    #[test]
    fn test_filters() {
        // ---
        let mut high = situation(7, Label::Anomalous, &[TEMP]);
        high.record.severity = Some(Severity::High);
        let records = derive(&[high, situation(8, Label::Anomalous, &[HUMID])]);

        assert_eq!(filter_by_severity(records.clone(), Some(Severity::High)).len(), 1);
        assert_eq!(filter_by_severity(records.clone(), None).len(), 2);
        assert_eq!(filter_by_status(records.clone(), Some(ReviewStatus::Reviewed)).len(), 0);
        assert_eq!(filter_by_status(records, Some(ReviewStatus::Pending)).len(), 2);
    }

    #[test]
    fn test_status_parses_from_db_text() {
        // ---
        for status in [
            ReviewStatus::Pending,
            ReviewStatus::Reviewed,
            ReviewStatus::Dismissed,
            ReviewStatus::Escalated,
        ] {
            assert_eq!(status.as_str().parse::<ReviewStatus>(), Ok(status));
        }
        assert!("closed".parse::<ReviewStatus>().is_err());
    }
}
