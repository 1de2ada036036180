use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{bson, Database as DatabaseHandle};

use crate::database::MongoCampaignStore;
use crate::error::Error;

use super::{Campaign, CampaignChanges, CampaignId, CampaignSnapshot};

pub const CAMPAIGNS: &str = "campaigns";

/// Creates the campaigns collection if needed and enables the pre- and
/// post-images the change stream relies on.
pub async fn initialize(db: &DatabaseHandle) -> Result<(), Error> {
    let existing = db
        .list_collection_names(bson::doc! { "name": CAMPAIGNS })
        .await?;
    if existing.is_empty() {
        db.create_collection(CAMPAIGNS, None).await?;
    }

    db.run_command(
        bson::doc! {
            "collMod": CAMPAIGNS,
            "changeStreamPreAndPostImages": { "enabled": true },
        },
        None,
    )
    .await?;

    db.run_command(
        bson::doc! {
            "createIndexes": CAMPAIGNS,
            "indexes": [
                { "key": { "created_at": -1 }, "name": "by_created_at" },
            ]
        },
        None,
    )
    .await?;

    Ok(())
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error>;

    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error>;

    async fn fetch_campaign_by_id(&self, campaign_id: CampaignId)
        -> Result<Option<Campaign>, Error>;

    async fn update_campaign(
        &self,
        campaign: Campaign,
        changes: CampaignChanges,
    ) -> Result<Campaign, Error>;

    async fn update_campaign_published(
        &self,
        campaign: Campaign,
        is_published: bool,
    ) -> Result<Campaign, Error>;

    async fn delete_campaign(&self, campaign_id: CampaignId) -> Result<bool, Error>;

    /// Server-side count of every campaign.
    async fn count_campaigns(&self) -> Result<u64, Error>;

    /// Full scan reading only the aggregable fields of every campaign.
    async fn fetch_campaign_snapshots(&self) -> Result<Vec<CampaignSnapshot>, Error>;
}

#[async_trait]
impl CampaignStore for MongoCampaignStore {
    #[tracing::instrument(skip(self))]
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
        self.insert_one(campaign, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        let options = FindOptions::builder()
            .sort(bson::doc! { "created_at": -1 })
            .build();

        let campaigns: Vec<Campaign> = self
            .find(bson::doc! {}, options)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaign_by_id(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Campaign>, Error> {
        let campaign: Option<Campaign> = self
            .find_one(bson::doc! { "_id": campaign_id }, None)
            .await?;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign(
        &self,
        mut campaign: Campaign,
        changes: CampaignChanges,
    ) -> Result<Campaign, Error> {
        let now = Utc::now();
        let old_modified_at = bson::DateTime::from_chrono(campaign.modified_at);
        let new_modified_at = bson::DateTime::from_chrono(now);
        let mut fields = bson::to_document(&changes)?;
        fields.insert("modified_at", new_modified_at);

        let result = self
            .update_one(
                bson::doc! { "_id": campaign.id, "modified_at": old_modified_at },
                bson::doc! { "$set": fields },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(Error::ConcurrentModificationDetected);
        }

        campaign.apply(&changes);
        campaign.modified_at = now;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign_published(
        &self,
        mut campaign: Campaign,
        is_published: bool,
    ) -> Result<Campaign, Error> {
        let now = Utc::now();
        let old_modified_at = bson::DateTime::from_chrono(campaign.modified_at);
        let new_modified_at = bson::DateTime::from_chrono(now);

        let result = self
            .update_one(
                bson::doc! { "_id": campaign.id, "modified_at": old_modified_at },
                bson::doc! { "$set": { "is_published": is_published, "modified_at": new_modified_at } },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(Error::ConcurrentModificationDetected);
        }

        campaign.is_published = is_published;
        campaign.modified_at = now;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_campaign(&self, campaign_id: CampaignId) -> Result<bool, Error> {
        let result = self
            .delete_one(bson::doc! { "_id": campaign_id }, None)
            .await?;

        Ok(result.deleted_count > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn count_campaigns(&self) -> Result<u64, Error> {
        let count = self.count_documents(bson::doc! {}, None).await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaign_snapshots(&self) -> Result<Vec<CampaignSnapshot>, Error> {
        let options = FindOptions::builder()
            .projection(CampaignSnapshot::projection())
            .build();

        let documents: Vec<bson::Document> = self
            .clone_with_type::<bson::Document>()
            .find(bson::doc! {}, options)
            .await?
            .try_collect()
            .await?;

        Ok(documents
            .iter()
            .map(CampaignSnapshot::from_document)
            .collect())
    }
}
