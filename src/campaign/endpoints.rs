use actix_web::web::{Data, Json, Path, Query};
use actix_web::{delete, get, patch, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::Error;
use crate::user::{self, Credentials};

use super::{
    manager, Campaign, CampaignCategory, CampaignChanges, CampaignFilter, CampaignId,
    CampaignStatus, Visibility,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateCampaignBody {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<CampaignCategory>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reach: Option<i64>,
    #[serde(default)]
    pub clicks: Option<i64>,
    #[serde(default)]
    pub likes: Option<i64>,
}

impl CreateCampaignBody {
    fn into_details(self) -> (CampaignChanges, bool) {
        let details = CampaignChanges {
            title: Some(self.title),
            description: self.description,
            category: self.category,
            visibility: self.visibility,
            start_at: self.start_at,
            end_at: self.end_at,
            reach: self.reach,
            clicks: self.clicks,
            likes: self.likes,
        };

        (details, self.is_published)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignBody {
    pub id: CampaignId,
    pub title: String,
    pub description: Option<String>,
    pub category: CampaignCategory,
    pub visibility: Visibility,
    pub is_published: bool,
    pub status: CampaignStatus,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub reach: i64,
    pub clicks: i64,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl CampaignBody {
    pub fn render(campaign: Campaign, now: DateTime<Utc>) -> CampaignBody {
        CampaignBody {
            status: campaign.status(now),
            id: campaign.id,
            title: campaign.title,
            description: campaign.description,
            category: campaign.category,
            visibility: campaign.visibility,
            is_published: campaign.is_published,
            start_at: campaign.start_at,
            end_at: campaign.end_at,
            reach: campaign.reach,
            clicks: campaign.clicks,
            likes: campaign.likes,
            created_at: campaign.created_at,
            modified_at: campaign.modified_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublishBody {
    pub publish: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteBody {
    pub ok: bool,
    pub deleted: bool,
}

#[post("/campaigns")]
#[tracing::instrument(skip(db))]
pub async fn create_campaign(
    db: Data<dyn Database>,
    credentials: Credentials,
    body: Json<CreateCampaignBody>,
) -> Result<Json<CampaignBody>, Error> {
    let (details, is_published) = body.into_inner().into_details();

    let principal = user::manager::authenticate(db.get_ref(), &credentials).await?;
    if is_published && !principal.claims.is_admin() {
        return Err(Error::PermissionDenied {
            user_id: principal.id,
        });
    }

    let campaign = manager::create_campaign(db.get_ref(), details, is_published).await?;

    Ok(Json(CampaignBody::render(campaign, Utc::now())))
}

#[get("/campaigns")]
#[tracing::instrument(skip(db))]
pub async fn get_campaigns(
    db: Data<dyn Database>,
    query: Query<CampaignFilter>,
) -> Result<Json<Vec<CampaignBody>>, Error> {
    let now = Utc::now();
    let campaigns = manager::get_campaigns(db.get_ref(), &query, now).await?;

    let body = campaigns
        .into_iter()
        .map(|campaign| CampaignBody::render(campaign, now))
        .collect();

    Ok(Json(body))
}

#[get("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(db))]
pub async fn get_campaign_by_id(
    db: Data<dyn Database>,
    params: Path<CampaignId>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign_id = params.into_inner();

    let campaign = manager::get_campaign_by_id(db.get_ref(), campaign_id).await?;

    Ok(Json(CampaignBody::render(campaign, Utc::now())))
}

#[patch("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(db))]
pub async fn update_campaign(
    db: Data<dyn Database>,
    credentials: Credentials,
    params: Path<CampaignId>,
    body: Json<CampaignChanges>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign_id = params.into_inner();
    user::manager::authenticate(db.get_ref(), &credentials).await?;

    let campaign = manager::update_campaign(db.get_ref(), campaign_id, body.into_inner()).await?;

    Ok(Json(CampaignBody::render(campaign, Utc::now())))
}

#[post("/campaigns/{campaign_id}/publish")]
#[tracing::instrument(skip(db))]
pub async fn publish_campaign(
    db: Data<dyn Database>,
    credentials: Credentials,
    params: Path<CampaignId>,
    body: Json<PublishBody>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign_id = params.into_inner();
    let principal = user::manager::require_admin(db.get_ref(), &credentials).await?;

    let campaign =
        manager::set_campaign_published(db.get_ref(), &principal, campaign_id, body.publish)
            .await?;

    Ok(Json(CampaignBody::render(campaign, Utc::now())))
}

#[delete("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(db))]
pub async fn delete_campaign(
    db: Data<dyn Database>,
    credentials: Credentials,
    params: Path<CampaignId>,
) -> Result<Json<DeleteBody>, Error> {
    let campaign_id = params.into_inner();
    let principal = user::manager::require_admin(db.get_ref(), &credentials).await?;

    let deleted = manager::hard_delete_campaign(db.get_ref(), &principal, campaign_id).await?;

    Ok(Json(DeleteBody { ok: true, deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test::{sample_campaign, sample_principal, MockDatabase};
    use crate::user::Claims;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use chrono::Duration;
    use std::sync::Arc;

    #[actix_web::test]
    async fn get_campaign_reports_derived_status() {
        let mut db = MockDatabase::new();
        let mut existing = sample_campaign("Countdown");
        existing.is_published = true;
        existing.start_at = Some(Utc::now() + Duration::days(2));
        let campaign_id = existing.id;
        db.campaigns.on_fetch_campaign_by_id = Box::new(move |_| Ok(Some(existing.clone())));
        let db: Arc<dyn Database> = Arc::new(db);
        let app = test::init_service(
            App::new()
                .app_data(Data::from(db))
                .configure(crate::configure),
        )
        .await;

        let request = test::TestRequest::get()
            .uri(&format!("/campaigns/{}", campaign_id))
            .to_request();
        let body: CampaignBody = test::call_and_read_body_json(&app, request).await;

        assert_eq!(body.id, campaign_id);
        assert_eq!(body.status, CampaignStatus::Scheduled);
    }

    #[actix_web::test]
    async fn list_filters_by_query() {
        let mut db = MockDatabase::new();
        db.campaigns.on_fetch_campaigns = Box::new(|()| {
            let mut remix = sample_campaign("Fan Remix");
            remix.category = CampaignCategory::Ugc;
            Ok(vec![remix, sample_campaign("Plain")])
        });
        let db: Arc<dyn Database> = Arc::new(db);
        let app = test::init_service(
            App::new()
                .app_data(Data::from(db))
                .configure(crate::configure),
        )
        .await;

        let request = test::TestRequest::get()
            .uri("/campaigns?category=UGC&status=draft")
            .to_request();
        let body: Vec<CampaignBody> = test::call_and_read_body_json(&app, request).await;

        assert_eq!(body.len(), 1);
        assert_eq!(body[0].title, "Fan Remix");
    }

    #[actix_web::test]
    async fn list_rejects_unknown_status() {
        let db: Arc<dyn Database> = Arc::new(MockDatabase::new());
        let app = test::init_service(
            App::new()
                .app_data(Data::from(db))
                .configure(crate::configure),
        )
        .await;

        let request = test::TestRequest::get()
            .uri("/campaigns?status=archived")
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn missing_campaign_is_not_found() {
        let mut db = MockDatabase::new();
        db.campaigns.on_fetch_campaign_by_id = Box::new(|_| Ok(None));
        let db: Arc<dyn Database> = Arc::new(db);
        let app = test::init_service(
            App::new()
                .app_data(Data::from(db))
                .configure(crate::configure),
        )
        .await;

        let request = test::TestRequest::get()
            .uri(&format!("/campaigns/{}", CampaignId::new()))
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn publish_requires_admin() {
        let principal = sample_principal(
            "editor-token",
            Claims {
                admin: false,
                role: Some("editor".into()),
            },
        );
        let db: Arc<dyn Database> = Arc::new(MockDatabase::new().with_principal(principal));
        let app = test::init_service(
            App::new()
                .app_data(Data::from(db))
                .configure(crate::configure),
        )
        .await;

        let request = test::TestRequest::post()
            .uri(&format!("/campaigns/{}/publish", CampaignId::new()))
            .insert_header((header::AUTHORIZATION, "Bearer editor-token"))
            .set_json(PublishBody { publish: true })
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn delete_reports_absent_campaign() {
        let principal = sample_principal(
            "admin-token",
            Claims {
                admin: true,
                role: None,
            },
        );
        let mut db = MockDatabase::new().with_principal(principal);
        db.campaigns.on_fetch_campaign_by_id = Box::new(|_| Ok(None));
        db.campaigns.on_delete_campaign = Box::new(|_| Ok(false));
        let db: Arc<dyn Database> = Arc::new(db);
        let app = test::init_service(
            App::new()
                .app_data(Data::from(db))
                .configure(crate::configure),
        )
        .await;

        let request = test::TestRequest::delete()
            .uri(&format!("/campaigns/{}", CampaignId::new()))
            .insert_header((header::AUTHORIZATION, "Bearer admin-token"))
            .to_request();
        let body: DeleteBody = test::call_and_read_body_json(&app, request).await;

        assert!(body.ok);
        assert!(!body.deleted);
    }

    #[actix_web::test]
    async fn create_with_invalid_window_is_bad_request() {
        let principal = sample_principal("editor-token", Claims::default());
        let db: Arc<dyn Database> = Arc::new(MockDatabase::new().with_principal(principal));
        let app = test::init_service(
            App::new()
                .app_data(Data::from(db))
                .configure(crate::configure),
        )
        .await;

        let now = Utc::now();
        let body = CreateCampaignBody {
            title: "Backwards".into(),
            start_at: Some(now),
            end_at: Some(now - Duration::days(1)),
            ..Default::default()
        };
        let request = test::TestRequest::post()
            .uri("/campaigns")
            .insert_header((header::AUTHORIZATION, "Bearer editor-token"))
            .set_json(body)
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
