//! Presentation routes for the four aggregator outputs.
//!
//! Each handler takes a fresh snapshot and runs one pure aggregator over it.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{split_list, ApiError, ApiResult, AppState};
use crate::aggregate::{self, Window};
use crate::kinds::{self, KindInfo};
use crate::models::{ActivityBucket, ComparisonRow, RawReading, TimeSeriesPoint};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/readings/latest", get(latest))
        .route("/api/readings/series", get(series))
        .route("/api/activity", get(activity))
        .route("/api/comparison", get(comparison))
}

/// Query parameters shared by the filtered views.
#[derive(Debug, Deserialize)]
struct FilterQuery {
    kind: Option<String>,
    start: Option<i64>,
    end: Option<i64>,
    /// Comma-separated room names.
    rooms: Option<String>,
}

impl FilterQuery {
    fn window(&self) -> Window {
        Window::new(self.start, self.end)
    }

    fn rooms(&self) -> Option<Vec<String>> {
        split_list(self.rooms.as_deref())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LatestReading {
    #[serde(flatten)]
    info: KindInfo,
    display_value: String,
    reading: RawReading,
}

/// `GET /api/readings/latest`: newest reading per kind, keyed by kind name.
async fn latest(State(state): State<AppState>) -> Json<BTreeMap<String, LatestReading>> {
    // ---
    let snapshot = state.store.snapshot();
    let latest = aggregate::latest_by_kind(&snapshot)
        .into_iter()
        .map(|(kind, reading)| {
            let view = LatestReading {
                info: kinds::info(&reading.kind),
                display_value: kinds::display_value(&reading),
                reading,
            };
            (kind, view)
        })
        .collect();
    Json(latest)
}

/// `GET /api/readings/series?kind=&start=&end=&rooms=`
async fn series(
    State(state): State<AppState>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TimeSeriesPoint>>> {
    // ---
    let Query(query) = query?;
    let kind = query
        .kind
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing 'kind' query parameter"))?;
    let rooms = query.rooms();

    let points = aggregate::extract(&state.store.snapshot(), kind, query.window(), rooms.as_deref());
    debug!("GET /api/readings/series - kind={} points={}", kind, points.len());
    Ok(Json(points))
}

/// `GET /api/activity?start=&end=&rooms=`
async fn activity(
    State(state): State<AppState>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ActivityBucket>>> {
    // ---
    let Query(query) = query?;
    let rooms = query.rooms();
    Ok(Json(aggregate::aggregate(
        &state.store.snapshot(),
        query.window(),
        rooms.as_deref(),
        state.clock,
    )))
}

/// `GET /api/comparison?start=&end=`
async fn comparison(
    State(state): State<AppState>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ComparisonRow>>> {
    // ---
    let Query(query) = query?;
    Ok(Json(aggregate::compare(&state.store.snapshot(), query.window())))
}
