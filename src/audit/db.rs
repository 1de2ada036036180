use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{bson, Database as DatabaseHandle};

use crate::campaign::CampaignId;
use crate::database::MongoAuditStore;
use crate::error::Error;

use super::AuditEntry;

pub const AUDIT_LOGS: &str = "audit_logs";

pub async fn initialize(db: &DatabaseHandle) -> Result<(), Error> {
    db.run_command(
        bson::doc! {
            "createIndexes": AUDIT_LOGS,
            "indexes": [
                { "key": { "campaign_id": 1, "at": -1 }, "name": "by_campaign_at" },
            ]
        },
        None,
    )
    .await?;

    Ok(())
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert_audit_entry(&self, entry: &AuditEntry) -> Result<(), Error>;

    /// Newest first.
    async fn fetch_audit_entries_by_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<AuditEntry>, Error>;
}

#[async_trait]
impl AuditStore for MongoAuditStore {
    #[tracing::instrument(skip(self, entry), fields(action = ?entry.action, campaign_id = %entry.campaign_id))]
    async fn insert_audit_entry(&self, entry: &AuditEntry) -> Result<(), Error> {
        self.insert_one(entry, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_audit_entries_by_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<AuditEntry>, Error> {
        let options = FindOptions::builder().sort(bson::doc! { "at": -1 }).build();

        let entries: Vec<AuditEntry> = self
            .find(bson::doc! { "campaign_id": campaign_id.to_string() }, options)
            .await?
            .try_collect()
            .await?;

        Ok(entries)
    }
}
