//! Situation routes: the raw situation list, label updates by index, recent
//! situations and the status summary.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ApiError, ApiResult, AppState};
use crate::aggregate::{count_anomalies, rooms, sensor_kinds};
use crate::anomaly::{anomaly_id, count_pending};
use crate::models::{Label, Situation, SituationRecord};
use crate::store::SituationKey;

// ---

const DEFAULT_RECENT: usize = 5;

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/sensor-data", get(list_situations))
        .route("/api/sensor-data/{index}", put(update_situation))
        .route("/api/situations/recent", get(recent_situations))
        .route("/api/summary", get(summary))
}

/// `GET /api/sensor-data`: every record in the ingestion wire format.
async fn list_situations(State(state): State<AppState>) -> Json<Vec<SituationRecord>> {
    // ---
    let records = state.store.records();
    debug!("GET /api/sensor-data - {} situations", records.len());
    Json(records)
}

/// Body of `PUT /api/sensor-data/{index}`.
#[derive(Debug, Deserialize)]
struct SituationUpdate {
    /// Echo of the path index, sent by older clients.
    #[serde(default)]
    index: Option<usize>,
    estimate: Label,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Serialize)]
struct UpdateResponse {
    message: &'static str,
    data: SituationRecord,
}

/// `PUT /api/sensor-data/{index}`: relabel the situation at `index`.
async fn update_situation(
    State(state): State<AppState>,
    index: Result<Path<usize>, PathRejection>,
    update: Result<Json<SituationUpdate>, JsonRejection>,
) -> ApiResult<Json<UpdateResponse>> {
    // ---
    let Path(index) = index?;
    let Json(update) = update?;
    if let Some(body_index) = update.index.filter(|i| *i != index) {
        return Err(ApiError::bad_request(format!(
            "body index {body_index} does not match path index {index}"
        )));
    }

    let updated = state
        .store
        .update_label(SituationKey::Index(index), update.estimate, update.notes)?;
    info!(
        "PUT /api/sensor-data/{} - estimate={}",
        index,
        update.estimate.as_str()
    );

    if let Err(e) = state.persist_label(updated.id, update.estimate).await {
        warn!("Label kept in memory only: {}", e);
        return Err(e);
    }
    state.persist_review(anomaly_id(updated.id)).await?;

    Ok(Json(UpdateResponse {
        message: "Successfully updated",
        data: updated.record,
    }))
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    count: Option<usize>,
}

/// `GET /api/situations/recent?count=N`: newest situations first.
async fn recent_situations(
    State(state): State<AppState>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Situation>>> {
    // ---
    let Query(query) = query?;
    Ok(Json(
        state
            .store
            .recent_situations(query.count.unwrap_or(DEFAULT_RECENT)),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusSummary {
    total_situations: usize,
    anomalous_situations: usize,
    pending_reviews: usize,
    sensor_kinds: Vec<String>,
    rooms: Vec<String>,
    latest_window_end: Option<i64>,
}

/// `GET /api/summary`: the status-card numbers.
async fn summary(State(state): State<AppState>) -> Json<StatusSummary> {
    // ---
    let situations = state.store.snapshot();
    let anomalies = state.store.anomalies();

    Json(StatusSummary {
        total_situations: situations.len(),
        anomalous_situations: count_anomalies(&situations),
        pending_reviews: count_pending(&anomalies),
        sensor_kinds: sensor_kinds(&situations),
        rooms: rooms(&situations),
        latest_window_end: situations.iter().map(Situation::window_end).max(),
    })
}
