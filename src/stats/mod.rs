use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::{CampaignSnapshot, CampaignStatus, Engagement};

pub mod db;
pub mod endpoints;
pub mod manager;
pub mod scheduler;
pub use endpoints::*;

/// `_id` of the single counters document in the stats collection.
pub const CAMPAIGN_STATS_ID: &str = "campaigns";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusCounts {
    pub draft: i64,
    pub scheduled: i64,
    pub active: i64,
    pub completed: i64,
}

impl StatusCounts {
    pub fn get(&self, status: CampaignStatus) -> i64 {
        match status {
            CampaignStatus::Draft => self.draft,
            CampaignStatus::Scheduled => self.scheduled,
            CampaignStatus::Active => self.active,
            CampaignStatus::Completed => self.completed,
        }
    }

    pub fn bump(&mut self, status: CampaignStatus, amount: i64) {
        match status {
            CampaignStatus::Draft => self.draft += amount,
            CampaignStatus::Scheduled => self.scheduled += amount,
            CampaignStatus::Active => self.active += amount,
            CampaignStatus::Completed => self.completed += amount,
        }
    }

    pub fn sum(&self) -> i64 {
        CampaignStatus::ALL.iter().map(|status| self.get(*status)).sum()
    }
}

/// The denormalized counters document.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CampaignStats {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub total: i64,
    #[serde(flatten)]
    pub statuses: StatusCounts,
    #[serde(flatten)]
    pub engagement: Engagement,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl CampaignStats {
    pub fn empty(now: DateTime<Utc>) -> CampaignStats {
        CampaignStats {
            id: CAMPAIGN_STATS_ID.to_string(),
            total: 0,
            statuses: StatusCounts::default(),
            engagement: Engagement::default(),
            updated_at: now,
        }
    }

    /// Exact counters for the given campaigns, classified at `now`.
    pub fn tally(snapshots: &[CampaignSnapshot], now: DateTime<Utc>) -> CampaignStats {
        let mut stats = CampaignStats::empty(now);
        for snapshot in snapshots {
            stats.total += 1;
            stats.statuses.bump(snapshot.status(now), 1);
            stats.engagement = stats.engagement + snapshot.engagement;
        }
        stats
    }

    pub fn apply(&mut self, delta: &StatsDelta, now: DateTime<Utc>) {
        self.total += delta.total;
        for status in CampaignStatus::ALL {
            self.statuses.bump(status, delta.statuses.get(status));
        }
        self.engagement = self.engagement + delta.engagement;
        self.updated_at = now;
    }
}

#[cfg(test)]
impl CampaignStats {
    /// Same counters, ignoring when they were written.
    pub fn same_counts(&self, other: &CampaignStats) -> bool {
        self.total == other.total
            && self.statuses == other.statuses
            && self.engagement == other.engagement
    }
}

/// Amounts to add to each counter for a single change.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StatsDelta {
    pub total: i64,
    pub statuses: StatusCounts,
    pub engagement: Engagement,
}

impl StatsDelta {
    /// The nonzero increments keyed by counter field.
    pub fn increments(&self) -> Vec<(&'static str, i64)> {
        let mut increments = vec![("total", self.total)];
        increments.extend(
            CampaignStatus::ALL
                .iter()
                .map(|status| (status.field_name(), self.statuses.get(*status))),
        );
        increments.extend(self.engagement.fields());
        increments.retain(|(_, amount)| *amount != 0);
        increments
    }

    pub fn is_empty(&self) -> bool {
        self.increments().is_empty()
    }
}

/// The before and after state of one campaign mutation.
///
/// Delivery is at least once: the same event may arrive more than once,
/// and there is no ordering between events of different campaigns. Events
/// of one campaign arrive in mutation order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeEvent {
    pub before: Option<CampaignSnapshot>,
    pub after: Option<CampaignSnapshot>,
}

impl ChangeEvent {
    pub fn created(after: CampaignSnapshot) -> ChangeEvent {
        ChangeEvent {
            before: None,
            after: Some(after),
        }
    }

    pub fn updated(before: CampaignSnapshot, after: CampaignSnapshot) -> ChangeEvent {
        ChangeEvent {
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(before: CampaignSnapshot) -> ChangeEvent {
        ChangeEvent {
            before: Some(before),
            after: None,
        }
    }
}
