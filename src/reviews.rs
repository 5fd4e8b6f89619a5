//! PostgreSQL persistence for reviewer state.
//!
//! Optional: without a pool, review state only lives in the store.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::anomaly::{AnomalyId, ReviewState};

// ---

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    anomaly_id: AnomalyId,
    status: String,
    notes: Option<String>,
    updated_at: DateTime<Utc>,
}

/// Load every stored review. Rows with an unrecognized status are skipped.
pub async fn load_all(pool: &PgPool) -> Result<HashMap<AnomalyId, ReviewState>> {
    // ---
    let rows: Vec<ReviewRow> = sqlx::query_as(
        r#"
        SELECT anomaly_id, status, notes, updated_at
        FROM anomaly_review
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut reviews = HashMap::with_capacity(rows.len());
    for row in rows {
        match row.status.parse() {
            Ok(status) => {
                reviews.insert(
                    row.anomaly_id,
                    ReviewState {
                        status,
                        notes: row.notes,
                    },
                );
            }
            Err(e) => warn!(
                anomaly = %row.anomaly_id,
                updated_at = %row.updated_at,
                "Skipping stored review: {}",
                e
            ),
        }
    }

    info!("Loaded {} stored reviews", reviews.len());
    Ok(reviews)
}

/// Insert or replace the review for one anomaly.
pub async fn save(pool: &PgPool, anomaly_id: AnomalyId, review: &ReviewState) -> Result<()> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO anomaly_review (anomaly_id, status, notes, updated_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (anomaly_id) DO UPDATE SET
            status     = EXCLUDED.status,
            notes      = EXCLUDED.notes,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(anomaly_id)
    .bind(review.status.as_str())
    .bind(&review.notes)
    .execute(pool)
    .await?;

    Ok(())
}
