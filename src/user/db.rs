use async_trait::async_trait;
use mongodb::options::UpdateOptions;
use mongodb::{bson, Database as DatabaseHandle};

use crate::database::MongoPrincipalStore;
use crate::error::Error;

use super::Principal;

pub const PRINCIPALS: &str = "principals";

pub async fn initialize(db: &DatabaseHandle) -> Result<(), Error> {
    db.run_command(
        bson::doc! {
            "createIndexes": PRINCIPALS,
            "indexes": [
                { "key": { "token_hash": 1 }, "name": "by_token_hash", "unique": true },
            ]
        },
        None,
    )
    .await?;

    Ok(())
}

#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn fetch_principal_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Principal>, Error>;

    async fn upsert_principal(&self, principal: &Principal) -> Result<(), Error>;
}

#[async_trait]
impl PrincipalStore for MongoPrincipalStore {
    #[tracing::instrument(skip(self, token_hash))]
    async fn fetch_principal_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Principal>, Error> {
        let principal = self
            .find_one(bson::doc! { "token_hash": token_hash }, None)
            .await?;

        Ok(principal)
    }

    #[tracing::instrument(skip(self, principal), fields(name = %principal.name))]
    async fn upsert_principal(&self, principal: &Principal) -> Result<(), Error> {
        let claims = bson::to_bson(&principal.claims)?;
        let options = UpdateOptions::builder().upsert(true).build();
        self.update_one(
            bson::doc! { "name": principal.name.as_str() },
            bson::doc! {
                "$set": {
                    "token_hash": principal.token_hash.as_str(),
                    "claims": claims,
                },
                "$setOnInsert": {
                    "_id": principal.id,
                    "created_at": bson::DateTime::from_chrono(principal.created_at),
                },
            },
            options,
        )
        .await?;

        Ok(())
    }
}
