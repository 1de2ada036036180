use chrono::{DateTime, Utc};
use mongodb::bson::doc;

use crate::audit::{self, AuditAction, AuditEntry};
use crate::database::Database;
use crate::error::Error;
use crate::user::Principal;

use super::{snapshot, Campaign, CampaignChanges, CampaignFilter, CampaignId};

#[tracing::instrument(skip(db))]
pub async fn create_campaign(
    db: &dyn Database,
    details: CampaignChanges,
    is_published: bool,
) -> Result<Campaign, Error> {
    let now = Utc::now();
    let mut campaign = Campaign {
        id: CampaignId::new(),
        title: String::new(),
        description: None,
        category: Default::default(),
        visibility: Default::default(),
        is_published,
        start_at: None,
        end_at: None,
        reach: 0,
        clicks: 0,
        likes: 0,
        created_at: now,
        modified_at: now,
    };
    campaign.apply(&details);
    campaign.validate()?;

    db.campaigns().insert_campaign(&campaign).await?;

    Ok(campaign)
}

#[tracing::instrument(skip(db))]
pub async fn get_campaigns(
    db: &dyn Database,
    filter: &CampaignFilter,
    now: DateTime<Utc>,
) -> Result<Vec<Campaign>, Error> {
    let campaigns = db.campaigns().fetch_campaigns().await?;

    Ok(campaigns
        .into_iter()
        .filter(|campaign| filter.matches(campaign, now))
        .collect())
}

#[tracing::instrument(skip(db))]
pub async fn get_campaign_by_id(
    db: &dyn Database,
    campaign_id: CampaignId,
) -> Result<Campaign, Error> {
    let campaign = db
        .campaigns()
        .fetch_campaign_by_id(campaign_id)
        .await?
        .ok_or(Error::CampaignNotFound { campaign_id })?;

    Ok(campaign)
}

#[tracing::instrument(skip(db))]
pub async fn update_campaign(
    db: &dyn Database,
    campaign_id: CampaignId,
    changes: CampaignChanges,
) -> Result<Campaign, Error> {
    let campaign = get_campaign_by_id(db, campaign_id).await?;

    let mut updated = campaign.clone();
    updated.apply(&changes);
    updated.validate()?;

    let campaign = db.campaigns().update_campaign(campaign, changes).await?;

    Ok(campaign)
}

#[tracing::instrument(skip(db, principal), fields(user_id = %principal.id))]
pub async fn set_campaign_published(
    db: &dyn Database,
    principal: &Principal,
    campaign_id: CampaignId,
    publish: bool,
) -> Result<Campaign, Error> {
    let campaign = get_campaign_by_id(db, campaign_id).await?;
    let was_published = campaign.is_published;

    let campaign = db
        .campaigns()
        .update_campaign_published(campaign, publish)
        .await?;

    let action = if publish {
        AuditAction::Publish
    } else {
        AuditAction::Unpublish
    };
    let entry = AuditEntry::new(action, campaign_id.to_string(), audit::SOURCE_API, Utc::now())
        .by(principal.id)
        .with_images(
            Some(doc! { "is_published": was_published }),
            Some(doc! { "is_published": publish }),
        );
    audit::manager::record(db, entry).await;

    Ok(campaign)
}

/// Removes the campaign outright. Returns whether anything was deleted.
#[tracing::instrument(skip(db, principal), fields(user_id = %principal.id))]
pub async fn hard_delete_campaign(
    db: &dyn Database,
    principal: &Principal,
    campaign_id: CampaignId,
) -> Result<bool, Error> {
    let existing = db.campaigns().fetch_campaign_by_id(campaign_id).await?;

    let deleted = db.campaigns().delete_campaign(campaign_id).await?;

    if deleted {
        let entry = AuditEntry::new(
            AuditAction::HardDelete,
            campaign_id.to_string(),
            audit::SOURCE_API,
            Utc::now(),
        )
        .by(principal.id)
        .with_images(existing.as_ref().and_then(snapshot::to_document), None);
        audit::manager::record(db, entry).await;
    }

    Ok(deleted)
}
