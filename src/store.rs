//! Situation store: the single source of truth for the aggregators.
//!
//! Readers take an [`Arc`] snapshot and never hold the lock while they
//! compute. Writers build a new situation list and swap it in under the write
//! lock, so a reader sees either the whole update or none of it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::anomaly::{self, anomaly_id, AnomalyId, AnomalyRecord, ReviewState, ReviewStatus};
use crate::error::StoreError;
use crate::models::{Label, Situation, SituationId, SituationRecord};

// ---

const SITUATION_NAMESPACE: Uuid = Uuid::from_u128(0x2f0b_8c61_54e3_4d7a_9b15_c3a8_60e2_f4d9);

/// How a label update addresses its situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SituationKey {
    /// Position in the current snapshot.
    Index(usize),
    Id(SituationId),
}

impl std::fmt::Display for SituationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SituationKey::Index(i) => write!(f, "index {i}"),
            SituationKey::Id(id) => write!(f, "id {id}"),
        }
    }
}

struct StoreState {
    situations: Arc<[Situation]>,
    /// Labels set by reviewers, re-applied on every reload.
    label_overrides: HashMap<SituationId, Label>,
    /// Reviewer state, keyed by anomaly id so it outlives re-derivation.
    reviews: HashMap<AnomalyId, ReviewState>,
    /// Position of each situation in the last fetched source document.
    positions: HashMap<SituationId, usize>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            situations: Arc::from(Vec::new()),
            label_overrides: HashMap::new(),
            reviews: HashMap::new(),
            positions: HashMap::new(),
        }
    }
}

#[derive(Default)]
pub struct SituationStore {
    inner: RwLock<StoreState>,
}

/// Content-derived situation id. The label is not part of the content.
pub fn situation_id(record: &SituationRecord, occurrence: u32) -> SituationId {
    // ---
    let body = &record.situation;
    let mut name = Vec::new();
    name.extend_from_slice(body.situation_description.as_bytes());
    name.push(0);
    name.extend_from_slice(&body.start_timestamp.to_be_bytes());
    name.extend_from_slice(&body.end_timestamp.to_be_bytes());
    for detail in &body.details {
        name.push(0x1f);
        name.extend_from_slice(detail.as_bytes());
    }
    name.extend_from_slice(&occurrence.to_be_bytes());
    Uuid::new_v5(&SITUATION_NAMESPACE, &name)
}

impl SituationStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time view of all situations, in store order.
    pub fn snapshot(&self) -> Arc<[Situation]> {
        self.inner.read().situations.clone()
    }

    /// Current situations with their labels. Identities are not stable across
    /// calls; the returned values are copies.
    pub fn list(&self) -> Vec<(Situation, Label)> {
        self.snapshot()
            .iter()
            .map(|s| (s.clone(), s.label()))
            .collect()
    }

    /// Situation records in store order, in the ingestion wire format.
    pub fn records(&self) -> Vec<SituationRecord> {
        self.snapshot().iter().map(|s| s.record.clone()).collect()
    }

    /// Swap in a set of situations whose source positions are their indexes.
    pub fn replace_all(&self, records: Vec<SituationRecord>) -> usize {
        self.replace_sourced(records.into_iter().enumerate().collect())
    }

    /// Swap in a freshly fetched set of situations, each paired with its
    /// position in the source document.
    ///
    /// Ids are derived from content, so labels and reviews recorded against
    /// an id carry over. Records whose window ends before it starts are
    /// dropped.
    pub fn replace_sourced(&self, records: Vec<(usize, SituationRecord)>) -> usize {
        // ---
        let mut seen: HashMap<SituationId, u32> = HashMap::new();
        let mut fresh: Vec<Situation> = Vec::with_capacity(records.len());
        let mut positions: HashMap<SituationId, usize> = HashMap::with_capacity(records.len());

        for (position, record) in records {
            let body = &record.situation;
            if body.end_timestamp < body.start_timestamp {
                warn!(
                    start = body.start_timestamp,
                    end = body.end_timestamp,
                    "Dropping situation with inverted window"
                );
                continue;
            }
            let base = situation_id(&record, 0);
            let occurrence = seen.entry(base).or_insert(0);
            let id = if *occurrence == 0 {
                base
            } else {
                situation_id(&record, *occurrence)
            };
            *occurrence += 1;
            positions.insert(id, position);
            fresh.push(Situation { id, record });
        }

        let mut state = self.inner.write();
        for situation in &mut fresh {
            if let Some(label) = state.label_overrides.get(&situation.id) {
                situation.record.estimate = *label;
            }
        }
        let count = fresh.len();
        state.situations = fresh.into();
        state.positions = positions;
        count
    }

    /// Change one situation's label.
    ///
    /// `notes`, when given, are attached to the situation's anomaly review
    /// state. Existing review status is never reset.
    pub fn update_label(
        &self,
        key: SituationKey,
        label: Label,
        notes: Option<String>,
    ) -> Result<Situation, StoreError> {
        // ---
        let mut state = self.inner.write();
        let position = match key {
            SituationKey::Index(i) if i < state.situations.len() => Some(i),
            SituationKey::Index(_) => None,
            SituationKey::Id(id) => state.situations.iter().position(|s| s.id == id),
        }
        .ok_or_else(|| StoreError::situation_not_found(key))?;

        let mut situations = state.situations.to_vec();
        let situation = &mut situations[position];
        situation.record.estimate = label;
        let updated = situation.clone();

        state.label_overrides.insert(updated.id, label);
        if notes.is_some() {
            let review = state.reviews.entry(anomaly_id(updated.id)).or_default();
            let status = review.status;
            review.apply(status, notes);
        }
        state.situations = situations.into();

        info!(situation = %updated.id, label = label.as_str(), "Situation relabeled");
        Ok(updated)
    }

    /// The `n` situations with the greatest window end, newest first. Ties
    /// keep store order.
    pub fn recent_situations(&self, n: usize) -> Vec<Situation> {
        // ---
        let mut situations = self.snapshot().to_vec();
        situations.sort_by(|a, b| b.window_end().cmp(&a.window_end()));
        situations.truncate(n);
        situations
    }

    /// Anomaly records for the current snapshot with reviewer state merged in.
    pub fn anomalies(&self) -> Vec<AnomalyRecord> {
        // ---
        let state = self.inner.read();
        anomaly::reconcile(anomaly::derive(&state.situations), &state.reviews)
    }

    pub fn anomaly(&self, id: AnomalyId) -> Option<AnomalyRecord> {
        self.anomalies().into_iter().find(|r| r.id == id)
    }

    /// Record a review decision on a currently anomalous situation.
    pub fn update_review(
        &self,
        id: AnomalyId,
        status: ReviewStatus,
        notes: Option<String>,
    ) -> Result<AnomalyRecord, StoreError> {
        // ---
        let mut state = self.inner.write();
        let situation = state
            .situations
            .iter()
            .find(|s| s.label().is_anomalous() && anomaly_id(s.id) == id)
            .cloned()
            .ok_or_else(|| StoreError::anomaly_not_found(id))?;

        state.reviews.entry(id).or_default().apply(status, notes);

        info!(anomaly = %id, status = status.as_str(), "Anomaly reviewed");
        let derived = anomaly::derive(std::slice::from_ref(&situation));
        anomaly::reconcile(derived, &state.reviews)
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::anomaly_not_found(id))
    }

    /// Review interface: relabel the situation behind an anomaly id.
    ///
    /// The anomaly id resolves even after the situation was relabeled normal,
    /// so a reviewer can undo a dismissal.
    pub fn relabel_anomaly(
        &self,
        id: AnomalyId,
        label: Label,
        notes: Option<String>,
    ) -> Result<Situation, StoreError> {
        // ---
        let situation_id = self
            .snapshot()
            .iter()
            .find(|s| anomaly_id(s.id) == id)
            .map(|s| s.id)
            .ok_or_else(|| StoreError::anomaly_not_found(id))?;

        self.update_label(SituationKey::Id(situation_id), label, notes)
    }

    /// Where the situation sits in the source document it was loaded from.
    pub fn source_position(&self, id: SituationId) -> Option<usize> {
        self.inner.read().positions.get(&id).copied()
    }

    pub fn review_state(&self, id: AnomalyId) -> Option<ReviewState> {
        self.inner.read().reviews.get(&id).cloned()
    }

    /// Seed reviewer state, e.g. from persistence at startup.
    pub fn restore_reviews(&self, reviews: HashMap<AnomalyId, ReviewState>) {
        self.inner.write().reviews.extend(reviews);
    }
}
