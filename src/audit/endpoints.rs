use actix_web::get;
use actix_web::web::{Data, Json, Path};
use chrono::{DateTime, Utc};
use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::campaign::CampaignId;
use crate::database::Database;
use crate::error::Error;
use crate::user::{self, Credentials, UserId};

use super::{manager, AuditAction, AuditEntry, AuditEntryId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntryBody {
    pub id: AuditEntryId,
    pub at: DateTime<Utc>,
    pub action: AuditAction,
    pub campaign_id: String,
    pub actor: Option<UserId>,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub source: String,
}

impl AuditEntryBody {
    pub fn render(entry: AuditEntry) -> AuditEntryBody {
        let render_image = |image: Document| Bson::Document(image).into_relaxed_extjson();

        AuditEntryBody {
            id: entry.id,
            at: entry.at,
            action: entry.action,
            campaign_id: entry.campaign_id,
            actor: entry.actor,
            before: entry.before.map(render_image),
            after: entry.after.map(render_image),
            source: entry.source,
        }
    }
}

#[get("/campaigns/{campaign_id}/audit-logs")]
#[tracing::instrument(skip(db))]
pub async fn get_campaign_audit_logs(
    db: Data<dyn Database>,
    credentials: Credentials,
    params: Path<CampaignId>,
) -> Result<Json<Vec<AuditEntryBody>>, Error> {
    let campaign_id = params.into_inner();
    user::manager::require_admin(db.get_ref(), &credentials).await?;

    let entries = manager::get_audit_entries(db.get_ref(), campaign_id).await?;

    Ok(Json(entries.into_iter().map(AuditEntryBody::render).collect()))
}
