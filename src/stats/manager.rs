use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::campaign::{CampaignSnapshot, Engagement};
use crate::database::Database;
use crate::error::Error;

use super::{CampaignStats, ChangeEvent, StatsDelta};

/// Counter delta for one change, classifying both sides at `now`.
///
/// Creation adds one to the total and deletion removes one. Engagement
/// deltas are `after - before` with an absent side counting as zero. The
/// status buckets only move when the classification differs.
pub fn compute_delta(
    before: Option<&CampaignSnapshot>,
    after: Option<&CampaignSnapshot>,
    now: DateTime<Utc>,
) -> StatsDelta {
    let mut delta = StatsDelta::default();

    delta.total = match (before, after) {
        (None, Some(_)) => 1,
        (Some(_), None) => -1,
        _ => 0,
    };

    let before_status = before.map(|snapshot| snapshot.status(now));
    let after_status = after.map(|snapshot| snapshot.status(now));
    if before_status != after_status {
        if let Some(status) = before_status {
            delta.statuses.bump(status, -1);
        }
        if let Some(status) = after_status {
            delta.statuses.bump(status, 1);
        }
    }

    let engagement = |snapshot: Option<&CampaignSnapshot>| {
        snapshot.map_or_else(Engagement::default, |snapshot| snapshot.engagement)
    };
    delta.engagement = engagement(after) - engagement(before);

    delta
}

/// Applies one change to the counters document with a single atomic
/// increment. Replaying the same event applies it twice; the drift lasts
/// until the next reconciliation.
#[tracing::instrument(skip(db))]
pub async fn apply_change(
    db: &dyn Database,
    change: &ChangeEvent,
    now: DateTime<Utc>,
) -> Result<StatsDelta, Error> {
    let delta = compute_delta(change.before.as_ref(), change.after.as_ref(), now);

    if delta.is_empty() {
        debug!("change does not affect campaign stats");
        return Ok(delta);
    }

    db.stats().increment_campaign_stats(&delta, now).await?;

    Ok(delta)
}

/// Recomputes every counter from a full scan and overwrites the counters
/// document in one write.
///
/// The total always comes from the scan so that the status buckets add up
/// to it. The server-side count is only a cross-check: a mismatch means
/// campaigns changed during the scan and is logged, and a failed count is
/// logged and ignored. Nothing is written unless the scan succeeds.
#[tracing::instrument(skip(db))]
pub async fn recompute_stats(db: &dyn Database, now: DateTime<Utc>) -> Result<CampaignStats, Error> {
    let counted = match db.campaigns().count_campaigns().await {
        Ok(counted) => Some(counted),
        Err(err) => {
            warn!(%err, "failed to count campaigns, skipping the cross-check");
            None
        }
    };

    let snapshots = db.campaigns().fetch_campaign_snapshots().await?;
    let stats = CampaignStats::tally(&snapshots, now);

    if let Some(counted) = counted {
        if counted != snapshots.len() as u64 {
            warn!(
                counted,
                scanned = snapshots.len(),
                "campaigns changed during the scan, using the scanned total"
            );
        }
    }

    db.stats().overwrite_campaign_stats(&stats).await?;

    info!(
        total = stats.total,
        draft = stats.statuses.draft,
        scheduled = stats.statuses.scheduled,
        active = stats.statuses.active,
        completed = stats.statuses.completed,
        "recomputed campaign stats"
    );

    Ok(stats)
}

#[tracing::instrument(skip(db))]
pub async fn get_stats(db: &dyn Database) -> Result<Option<CampaignStats>, Error> {
    let stats = db.stats().fetch_campaign_stats().await?;

    Ok(stats)
}
