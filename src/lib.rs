use std::sync::Arc;

use actix_web::web::{self, Data, JsonConfig, PathConfig, QueryConfig};
use actix_web::{App, HttpResponse, HttpServer};
use mongodb::Client;
use tracing::info;
use tracing_actix_web::TracingLogger;

pub mod audit;
pub mod campaign;
pub mod config;
pub mod database;
pub mod error;
pub mod seed;
pub mod stats;
pub mod typedid;
pub mod user;
pub mod watcher;

pub use config::Config;
pub use error::Error;

use crate::database::{Database, MongoDatabase};

/// Registers every route and extractor error handler on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(JsonConfig::default().error_handler(|err, _req| {
        // format json errors with custom format
        Error::InvalidJson(err).into()
    }))
    .app_data(PathConfig::default().error_handler(|err, _req| {
        // format path errors with custom format
        Error::InvalidPath(err).into()
    }))
    .app_data(QueryConfig::default().error_handler(|err, _req| {
        // format query errors with custom format
        Error::InvalidQuery(err).into()
    }))
    .service(campaign::endpoints::create_campaign)
    .service(campaign::endpoints::get_campaigns)
    .service(campaign::endpoints::get_campaign_by_id)
    .service(campaign::endpoints::update_campaign)
    .service(campaign::endpoints::publish_campaign)
    .service(campaign::endpoints::delete_campaign)
    .service(audit::endpoints::get_campaign_audit_logs)
    .service(stats::endpoints::get_campaign_stats)
    .service(stats::endpoints::recompute_campaign_stats)
    .default_service(web::to(path_not_found));
}

async fn path_not_found() -> Result<HttpResponse, Error> {
    Err(Error::PathNotFound)
}

pub async fn run(config: Config) -> Result<(), Error> {
    info!("connecting to db: {}", config.mongodb_uri);
    let handle = Client::with_uri_str(&config.mongodb_uri)
        .await?
        .database(&config.mongodb_database);

    if config.seed {
        info!("dropping {} before seeding", config.mongodb_database);
        MongoDatabase::new(handle.clone()).drop().await?;
    }

    let db = MongoDatabase::initialize(handle).await?;

    if config.seed {
        seed::seed(&db).await?;
    }

    if let Some(token) = &config.admin_token {
        user::manager::ensure_admin_principal(&db, token).await?;
        info!("admin principal is ready");
    }

    tokio::spawn(watcher::watch_campaigns(db.clone(), config.watch_retry));

    let shared: Arc<dyn Database> = Arc::new(db);
    tokio::spawn(stats::scheduler::run_reconciliation(
        Arc::clone(&shared),
        config.reconcile_interval,
        config.reconcile_on_startup,
    ));

    let data = Data::from(shared);
    info!("listening on {}", config.bind_address);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(TracingLogger::default())
            .configure(configure)
    })
    .bind(&config.bind_address)?
    .run()
    .await?;

    Ok(())
}
