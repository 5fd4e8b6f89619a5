//! Backend for the carewatch sensor monitoring dashboard.
//!
//! The core is a set of pure projections over a snapshot of labeled
//! situations (see [`aggregate`]). Around it sit the situation store, the
//! ingestion sources, optional review persistence and the HTTP routes.
//!
//! Module boundaries follow the Explicit Module Boundary Pattern (EMBP):
//! sibling modules import shared types from this gateway rather than from
//! each other's internals.

pub mod aggregate;
pub mod anomaly;
pub mod config;
pub mod decoder;
pub mod error;
pub mod kinds;
pub mod models;
pub mod refresh;
pub mod reviews;
pub mod routes;
pub mod schema;
pub mod source;
pub mod store;

pub use aggregate::{HourClock, Window};
pub use anomaly::{AnomalyRecord, ReviewState, ReviewStatus, Severity};
pub use config::Config;
pub use error::{MalformedReading, StoreError, UpstreamFetchError};
pub use models::{
    ActivityBucket, ComparisonRow, Label, RawReading, SensorKind, Situation, SituationRecord,
    TimeSeriesPoint,
};
pub use source::SituationSource;
pub use store::{SituationKey, SituationStore};
