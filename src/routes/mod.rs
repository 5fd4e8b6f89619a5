//! HTTP gateway: merges every subrouter and attaches the shared state.

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use tracing::error;

use crate::aggregate::HourClock;
use crate::anomaly::AnomalyId;
use crate::error::StoreError;
use crate::models::{Label, SituationId};
use crate::source::SituationSource;
use crate::store::{SituationKey, SituationStore};

mod aggregates;
mod anomalies;
mod error;
mod health;
mod sensor_data;

pub use error::{ApiError, ApiResult};

// ---

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SituationStore>,
    pub source: Arc<SituationSource>,
    /// Review persistence; `None` keeps reviews in memory only.
    pub pool: Option<PgPool>,
    pub clock: HourClock,
}

impl AppState {
    // ---
    /// Persist the current review state of one anomaly, if persistence is on.
    pub(crate) async fn persist_review(&self, id: AnomalyId) -> ApiResult<()> {
        let (Some(pool), Some(review)) = (&self.pool, self.store.review_state(id)) else {
            return Ok(());
        };
        crate::reviews::save(pool, id, &review).await.map_err(|e| {
            error!(anomaly = %id, "Failed to persist review: {}", e);
            ApiError::Internal(e)
        })
    }

    /// Write one situation's new label back to the source document.
    pub(crate) async fn persist_label(&self, id: SituationId, label: Label) -> ApiResult<()> {
        let position = self
            .store
            .source_position(id)
            .ok_or_else(|| StoreError::situation_not_found(SituationKey::Id(id)))?;
        self.source
            .persist_label(position, label)
            .await
            .map_err(ApiError::from)
    }
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(sensor_data::router())
        .merge(aggregates::router())
        .merge(anomalies::router())
        .merge(health::router())
        .with_state(state)
}

/// Split a comma-separated query value into trimmed, non-empty items.
pub(crate) fn split_list(value: Option<&str>) -> Option<Vec<String>> {
    value.map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
}
