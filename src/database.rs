use async_trait::async_trait;
use mongodb::bson::Document;
use mongodb::{Collection, Database as DatabaseHandle};

use crate::audit::db::AuditStore;
use crate::audit::AuditEntry;
use crate::campaign::db::CampaignStore;
use crate::campaign::Campaign;
use crate::error::Error;
use crate::stats::db::StatsStore;
use crate::stats::CampaignStats;
use crate::user::db::PrincipalStore;
use crate::user::Principal;
use crate::{audit, campaign, stats, user};

pub type MongoCampaignStore = Collection<Campaign>;
pub type MongoStatsStore = Collection<CampaignStats>;
pub type MongoAuditStore = Collection<AuditEntry>;
pub type MongoPrincipalStore = Collection<Principal>;

/// Every store the service reads and writes, passed explicitly so tests
/// can substitute [`test::MockDatabase`].
#[async_trait]
pub trait Database: Send + Sync {
    fn campaigns(&self) -> &dyn CampaignStore;
    fn stats(&self) -> &dyn StatsStore;
    fn audit_logs(&self) -> &dyn AuditStore;
    fn principals(&self) -> &dyn PrincipalStore;

    async fn drop(&self) -> Result<(), Error>;
}

#[derive(Debug, Clone)]
pub struct MongoDatabase {
    campaigns: MongoCampaignStore,
    stats: MongoStatsStore,
    audit_logs: MongoAuditStore,
    principals: MongoPrincipalStore,
    db: DatabaseHandle,
}

impl MongoDatabase {
    pub fn new(db: DatabaseHandle) -> MongoDatabase {
        MongoDatabase {
            campaigns: db.collection(campaign::db::CAMPAIGNS),
            stats: db.collection(stats::db::STATS),
            audit_logs: db.collection(audit::db::AUDIT_LOGS),
            principals: db.collection(user::db::PRINCIPALS),
            db,
        }
    }

    pub async fn initialize(db: DatabaseHandle) -> Result<MongoDatabase, Error> {
        campaign::db::initialize(&db).await?;
        audit::db::initialize(&db).await?;
        user::db::initialize(&db).await?;

        Ok(MongoDatabase::new(db))
    }

    /// The campaigns collection without a schema, as the change stream and
    /// aggregation read it.
    pub fn campaign_documents(&self) -> Collection<Document> {
        self.campaigns.clone_with_type()
    }
}

#[async_trait]
impl Database for MongoDatabase {
    fn campaigns(&self) -> &dyn CampaignStore {
        &self.campaigns
    }

    fn stats(&self) -> &dyn StatsStore {
        &self.stats
    }

    fn audit_logs(&self) -> &dyn AuditStore {
        &self.audit_logs
    }

    fn principals(&self) -> &dyn PrincipalStore {
        &self.principals
    }

    async fn drop(&self) -> Result<(), Error> {
        self.db.drop(None).await?;
        Ok(())
    }
}
