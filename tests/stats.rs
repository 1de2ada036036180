use std::time::Duration;

use awc::Client;
use campaign_stats::campaign::{CampaignBody, CreateCampaignBody, PublishBody};
use campaign_stats::stats::{RecomputeBody, StatsBody};
use campaign_stats::Config;

const ADMIN_TOKEN: &str = "integration-admin-token";
const BIND_ADDRESS: &str = "127.0.0.1:18080";

fn start_server() {
    let config = Config::from_lookup(|key| match key {
        "MONGODB_DATABASE" => Some("campaign_stats_it".to_string()),
        "BIND_ADDRESS" => Some(BIND_ADDRESS.to_string()),
        "SEED" => Some("true".to_string()),
        "ADMIN_TOKEN" => Some(ADMIN_TOKEN.to_string()),
        _ => None,
    })
    .unwrap();

    std::thread::spawn(move || {
        let _ = actix_web::rt::System::new().block_on(campaign_stats::run(config));
    });
}

#[actix_web::test]
#[ignore = "needs a MongoDB replica set on localhost:27017"]
async fn recompute_counts_created_campaign() {
    start_server();
    actix_web::rt::time::sleep(Duration::from_secs(3)).await;

    let client = Client::default();
    let url = |path: &str| format!("http://{}{}", BIND_ADDRESS, path);
    let bearer = ("Authorization", format!("Bearer {}", ADMIN_TOKEN));

    let before: StatsBody = client
        .get(url("/stats/campaigns"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let body = CreateCampaignBody {
        title: "The Green Bean Brigade".into(),
        reach: Some(100),
        ..Default::default()
    };
    let campaign: CampaignBody = client
        .post(url("/campaigns"))
        .insert_header(bearer.clone())
        .send_json(&body)
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(campaign.title, "The Green Bean Brigade".to_string());

    let _: CampaignBody = client
        .post(url(&format!("/campaigns/{}/publish", campaign.id)))
        .insert_header(bearer.clone())
        .send_json(&PublishBody { publish: true })
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let recomputed: RecomputeBody = client
        .post(url("/stats/campaigns/recompute"))
        .insert_header(bearer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(recomputed.ok);
    assert_eq!(recomputed.stats.total, before.total + 1);
    assert_eq!(recomputed.stats.active, before.active + 1);
    assert_eq!(recomputed.stats.reach, before.reach + 100);
}
