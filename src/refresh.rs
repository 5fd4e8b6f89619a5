//! Background refresh of the situation store from its source.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::UpstreamFetchError;
use crate::source::SituationSource;
use crate::store::SituationStore;

// ---

/// Fetch once and replace the store contents. Returns the number of
/// situations now held.
pub async fn refresh_once(
    source: &SituationSource,
    store: &SituationStore,
) -> Result<usize, UpstreamFetchError> {
    // ---
    let records = source.fetch().await?;
    let count = store.replace_sourced(records);
    debug!("Store refreshed with {} situations", count);
    Ok(count)
}

/// Poll `source` every `every` until the runtime shuts down.
///
/// A failed fetch keeps the previous snapshot and is retried on the next
/// tick only.
pub fn spawn(
    source: Arc<SituationSource>,
    store: Arc<SituationStore>,
    every: Duration,
) -> JoinHandle<()> {
    // ---
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; startup already loaded once.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = refresh_once(&source, &store).await {
                warn!("Refresh from {} failed: {}", source.describe(), e);
            }
        }
    })
}
