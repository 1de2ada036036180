use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::campaign::{Campaign, CampaignCategory, CampaignId, Visibility};
use crate::database::Database;
use crate::error::Error;
use crate::stats;

struct Demo {
    title: &'static str,
    category: CampaignCategory,
    is_published: bool,
    start_in_days: Option<i64>,
    end_in_days: Option<i64>,
}

const DEMOS: [Demo; 6] = [
    Demo {
        title: "Autumn Lookbook",
        category: CampaignCategory::Brand,
        is_published: false,
        start_in_days: Some(10),
        end_in_days: Some(40),
    },
    Demo {
        title: "Holiday Countdown",
        category: CampaignCategory::Contest,
        is_published: true,
        start_in_days: Some(21),
        end_in_days: Some(35),
    },
    Demo {
        title: "Creator Spotlight",
        category: CampaignCategory::Influencer,
        is_published: true,
        start_in_days: Some(-3),
        end_in_days: Some(11),
    },
    Demo {
        title: "Fan Remix Week",
        category: CampaignCategory::Ugc,
        is_published: true,
        start_in_days: None,
        end_in_days: None,
    },
    Demo {
        title: "Spring Cleanup Drive",
        category: CampaignCategory::Awareness,
        is_published: true,
        start_in_days: Some(-60),
        end_in_days: Some(-30),
    },
    Demo {
        title: "Internal Dry Run",
        category: CampaignCategory::Other,
        is_published: false,
        start_in_days: None,
        end_in_days: None,
    },
];

fn demo_campaign(demo: &Demo, now: DateTime<Utc>, rng: &mut impl Rng) -> Campaign {
    let reach = rng.gen_range(500..20_000);
    let clicks = rng.gen_range(0..=reach / 10);
    let likes = rng.gen_range(0..=clicks);

    Campaign {
        id: CampaignId::new(),
        title: demo.title.to_string(),
        description: None,
        category: demo.category,
        visibility: Visibility::Public,
        is_published: demo.is_published,
        start_at: demo.start_in_days.map(|days| now + Duration::days(days)),
        end_at: demo.end_in_days.map(|days| now + Duration::days(days)),
        reach,
        clicks,
        likes,
        created_at: now,
        modified_at: now,
    }
}

/// Inserts demo campaigns in every lifecycle state and computes their stats.
#[tracing::instrument(skip(db))]
pub async fn seed(db: &dyn Database) -> Result<(), Error> {
    let now = Utc::now();

    let campaigns: Vec<Campaign> = {
        let mut rng = rand::thread_rng();
        DEMOS
            .iter()
            .map(|demo| demo_campaign(demo, now, &mut rng))
            .collect()
    };

    for campaign in &campaigns {
        db.campaigns().insert_campaign(campaign).await?;
    }

    stats::manager::recompute_stats(db, now).await?;

    tracing::info!(campaigns = campaigns.len(), "seeded demo campaigns");

    Ok(())
}
