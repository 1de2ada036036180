use actix_web::web::{Data, Json};
use actix_web::{get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::Error;
use crate::user::{self, Credentials};

use super::{manager, CampaignStats};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsBody {
    pub total: i64,
    pub draft: i64,
    pub scheduled: i64,
    pub active: i64,
    pub completed: i64,
    pub reach: i64,
    pub clicks: i64,
    pub likes: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StatsBody {
    pub fn render(stats: Option<CampaignStats>) -> StatsBody {
        match stats {
            Some(stats) => StatsBody {
                total: stats.total,
                draft: stats.statuses.draft,
                scheduled: stats.statuses.scheduled,
                active: stats.statuses.active,
                completed: stats.statuses.completed,
                reach: stats.engagement.reach,
                clicks: stats.engagement.clicks,
                likes: stats.engagement.likes,
                updated_at: Some(stats.updated_at),
            },
            None => StatsBody::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecomputeBody {
    pub ok: bool,
    pub stats: StatsBody,
}

#[get("/stats/campaigns")]
#[tracing::instrument(skip(db))]
pub async fn get_campaign_stats(db: Data<dyn Database>) -> Result<Json<StatsBody>, Error> {
    let stats = manager::get_stats(db.get_ref()).await?;

    Ok(Json(StatsBody::render(stats)))
}

#[post("/stats/campaigns/recompute")]
#[tracing::instrument(skip(db))]
pub async fn recompute_campaign_stats(
    db: Data<dyn Database>,
    credentials: Credentials,
) -> Result<Json<RecomputeBody>, Error> {
    let principal = user::manager::require_admin(db.get_ref(), &credentials).await?;
    tracing::info!(user_id = %principal.id, "manual campaign stats recompute");

    let stats = manager::recompute_stats(db.get_ref(), Utc::now()).await?;

    Ok(Json(RecomputeBody {
        ok: true,
        stats: StatsBody::render(Some(stats)),
    }))
}
