use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::database::Database;

use super::manager;

/// Recomputes the campaign stats every `interval`, forever. The first run
/// happens immediately when `on_startup` is set, after one interval
/// otherwise. A failed run is logged and retried on the next tick.
pub async fn run_reconciliation(db: Arc<dyn Database>, interval: Duration, on_startup: bool) {
    let start = if on_startup {
        Instant::now()
    } else {
        Instant::now() + interval
    };
    let mut ticker = time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(interval_secs = interval.as_secs(), on_startup, "reconciliation scheduled");

    loop {
        ticker.tick().await;
        reconcile_once(db.as_ref()).await;
    }
}

#[tracing::instrument(skip(db))]
pub async fn reconcile_once(db: &dyn Database) {
    match manager::recompute_stats(db, Utc::now()).await {
        Ok(stats) => tracing::info!(total = stats.total, "reconciliation finished"),
        Err(err) => tracing::error!(error = %err, "reconciliation failed"),
    }
}
