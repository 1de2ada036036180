use crate::campaign::CampaignId;
use crate::database::Database;
use crate::error::Error;

use super::AuditEntry;

/// Appends `entry`, logging instead of failing when the write does not go
/// through.
#[tracing::instrument(skip(db, entry), fields(action = ?entry.action, campaign_id = %entry.campaign_id))]
pub async fn record(db: &dyn Database, entry: AuditEntry) {
    if let Err(err) = db.audit_logs().insert_audit_entry(&entry).await {
        tracing::warn!(error = %err, "failed to write audit entry");
    }
}

#[tracing::instrument(skip(db))]
pub async fn get_audit_entries(
    db: &dyn Database,
    campaign_id: CampaignId,
) -> Result<Vec<AuditEntry>, Error> {
    let entries = db
        .audit_logs()
        .fetch_audit_entries_by_campaign(campaign_id)
        .await?;

    Ok(entries)
}
