//! Database schema management for `carewatch-dashboard`.
//!
//! Ensures the review table exists before serving requests.
//! Applied once on startup from `main.rs` when `DATABASE_URL` is set.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `anomaly_review` table holding reviewer decisions keyed by
/// anomaly id. Safe to call on every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS anomaly_review (
            anomaly_id  UUID        PRIMARY KEY,
            status      TEXT        NOT NULL,
            notes       TEXT,
            updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_anomaly_review_status
            ON anomaly_review (status);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
