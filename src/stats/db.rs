use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, Document};
use mongodb::options::UpdateOptions;

use crate::database::MongoStatsStore;
use crate::error::Error;

use super::{CampaignStats, StatsDelta, CAMPAIGN_STATS_ID};

pub const STATS: &str = "stats";

#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn fetch_campaign_stats(&self) -> Result<Option<CampaignStats>, Error>;

    /// Atomically adds every nonzero amount of `delta` to the counters and
    /// stamps `updated_at`, creating the document if needed.
    async fn increment_campaign_stats(
        &self,
        delta: &StatsDelta,
        now: DateTime<Utc>,
    ) -> Result<(), Error>;

    /// Sets every counter in a single write, leaving unrelated fields alone.
    async fn overwrite_campaign_stats(&self, stats: &CampaignStats) -> Result<(), Error>;
}

#[async_trait]
impl StatsStore for MongoStatsStore {
    #[tracing::instrument(skip(self))]
    async fn fetch_campaign_stats(&self) -> Result<Option<CampaignStats>, Error> {
        let stats = self
            .find_one(bson::doc! { "_id": CAMPAIGN_STATS_ID }, None)
            .await?;

        Ok(stats)
    }

    #[tracing::instrument(skip(self))]
    async fn increment_campaign_stats(
        &self,
        delta: &StatsDelta,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let increments: Document = delta
            .increments()
            .into_iter()
            .map(|(field, amount)| (field.to_string(), bson::Bson::Int64(amount)))
            .collect();

        let mut update = bson::doc! {
            "$set": { "updated_at": bson::DateTime::from_chrono(now) },
        };
        // an empty $inc is rejected by the server
        if !increments.is_empty() {
            update.insert("$inc", increments);
        }

        let options = UpdateOptions::builder().upsert(true).build();
        self.update_one(bson::doc! { "_id": CAMPAIGN_STATS_ID }, update, options)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn overwrite_campaign_stats(&self, stats: &CampaignStats) -> Result<(), Error> {
        let mut fields = bson::to_document(stats)?;
        fields.remove("_id");

        let options = UpdateOptions::builder().upsert(true).build();
        self.update_one(
            bson::doc! { "_id": CAMPAIGN_STATS_ID },
            bson::doc! { "$set": fields },
            options,
        )
        .await?;

        Ok(())
    }
}
