//! Anomaly review routes.
//!
//! `PUT /api/anomalies/{id}/label` is the review interface proper: it
//! resolves the anomaly to its situation and relabels it. `PUT .../review`
//! records a reviewer's status and notes without touching the label.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use super::{ApiResult, AppState};
use crate::anomaly::{self, AnomalyId, AnomalyRecord, ReviewStatus, Severity};
use crate::error::StoreError;
use crate::models::{Label, Situation};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/anomalies", get(list_anomalies))
        .route("/api/anomalies/{id}", get(get_anomaly))
        .route("/api/anomalies/{id}/label", put(relabel))
        .route("/api/anomalies/{id}/review", put(review))
}

#[derive(Debug, Deserialize)]
struct AnomalyQuery {
    status: Option<ReviewStatus>,
    severity: Option<Severity>,
}

/// `GET /api/anomalies?status=&severity=`
async fn list_anomalies(
    State(state): State<AppState>,
    query: Result<Query<AnomalyQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<AnomalyRecord>>> {
    // ---
    let Query(query) = query?;
    let records = anomaly::filter_by_status(state.store.anomalies(), query.status);
    Ok(Json(anomaly::filter_by_severity(records, query.severity)))
}

/// `GET /api/anomalies/{id}`
async fn get_anomaly(
    State(state): State<AppState>,
    id: Result<Path<AnomalyId>, PathRejection>,
) -> ApiResult<Json<AnomalyRecord>> {
    // ---
    let Path(id) = id?;
    state
        .store
        .anomaly(id)
        .map(Json)
        .ok_or_else(|| StoreError::anomaly_not_found(id).into())
}

#[derive(Debug, Deserialize)]
struct RelabelRequest {
    label: Label,
    #[serde(default)]
    notes: Option<String>,
}

/// `PUT /api/anomalies/{id}/label`
async fn relabel(
    State(state): State<AppState>,
    id: Result<Path<AnomalyId>, PathRejection>,
    request: Result<Json<RelabelRequest>, JsonRejection>,
) -> ApiResult<Json<Situation>> {
    // ---
    let Path(id) = id?;
    let Json(request) = request?;
    let situation = state
        .store
        .relabel_anomaly(id, request.label, request.notes)?;
    info!("PUT /api/anomalies/{}/label - label={}", id, request.label.as_str());

    state.persist_label(situation.id, request.label).await?;
    state.persist_review(id).await?;
    Ok(Json(situation))
}

#[derive(Debug, Deserialize)]
struct ReviewRequest {
    status: ReviewStatus,
    #[serde(default)]
    notes: Option<String>,
}

/// `PUT /api/anomalies/{id}/review`
async fn review(
    State(state): State<AppState>,
    id: Result<Path<AnomalyId>, PathRejection>,
    request: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<Json<AnomalyRecord>> {
    // ---
    let Path(id) = id?;
    let Json(request) = request?;
    let record = state.store.update_review(id, request.status, request.notes)?;
    state.persist_review(id).await?;
    Ok(Json(record))
}
