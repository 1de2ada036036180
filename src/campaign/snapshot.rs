use std::ops::{Add, Sub};

use chrono::{DateTime, Utc};
use mongodb::bson::{self, Bson, Document};
use serde::{Deserialize, Serialize};

use super::{classify, Campaign, CampaignStatus};

/// Fields read from stored campaigns when aggregating.
pub const SNAPSHOT_FIELDS: [&str; 6] = [
    "is_published",
    "start_at",
    "end_at",
    "reach",
    "clicks",
    "likes",
];

/// Engagement sums saturate at the `i64` bounds instead of overflowing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Engagement {
    pub reach: i64,
    pub clicks: i64,
    pub likes: i64,
}

impl Engagement {
    pub fn fields(&self) -> [(&'static str, i64); 3] {
        [
            ("reach", self.reach),
            ("clicks", self.clicks),
            ("likes", self.likes),
        ]
    }
}

impl Add for Engagement {
    type Output = Engagement;

    fn add(self, other: Engagement) -> Engagement {
        Engagement {
            reach: self.reach.saturating_add(other.reach),
            clicks: self.clicks.saturating_add(other.clicks),
            likes: self.likes.saturating_add(other.likes),
        }
    }
}

impl Sub for Engagement {
    type Output = Engagement;

    fn sub(self, other: Engagement) -> Engagement {
        Engagement {
            reach: self.reach.saturating_sub(other.reach),
            clicks: self.clicks.saturating_sub(other.clicks),
            likes: self.likes.saturating_sub(other.likes),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum WindowBound {
    At(DateTime<Utc>),
    Invalid(String),
}

/// The aggregable projection of one stored campaign.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CampaignSnapshot {
    pub id: Option<String>,
    pub is_published: bool,
    pub start_at: Option<WindowBound>,
    pub end_at: Option<WindowBound>,
    pub engagement: Engagement,
}

impl CampaignSnapshot {
    /// Reads a raw stored document. Never fails: missing or malformed
    /// engagement values count as 0, a non-boolean publish flag counts as
    /// unpublished and unreadable timestamps become `WindowBound::Invalid`.
    pub fn from_document(document: &Document) -> CampaignSnapshot {
        CampaignSnapshot {
            id: document.get("_id").map(id_string),
            is_published: matches!(document.get("is_published"), Some(Bson::Boolean(true))),
            start_at: window_bound(document.get("start_at")),
            end_at: window_bound(document.get("end_at")),
            engagement: Engagement {
                reach: metric(document.get("reach")),
                clicks: metric(document.get("clicks")),
                likes: metric(document.get("likes")),
            },
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> CampaignStatus {
        classify(
            self.is_published,
            self.start_at.as_ref(),
            self.end_at.as_ref(),
            now,
        )
    }

    pub fn projection() -> Document {
        SNAPSHOT_FIELDS
            .iter()
            .map(|field| (field.to_string(), Bson::Int32(1)))
            .collect()
    }
}

impl From<&Campaign> for CampaignSnapshot {
    fn from(campaign: &Campaign) -> CampaignSnapshot {
        CampaignSnapshot {
            id: Some(campaign.id.to_string()),
            is_published: campaign.is_published,
            start_at: campaign.start_at.map(WindowBound::At),
            end_at: campaign.end_at.map(WindowBound::At),
            engagement: Engagement {
                reach: campaign.reach,
                clicks: campaign.clicks,
                likes: campaign.likes,
            },
        }
    }
}

pub fn id_string(id: &Bson) -> String {
    match id {
        Bson::String(id) => id.clone(),
        other => other.to_string(),
    }
}

fn metric(value: Option<&Bson>) -> i64 {
    match value {
        Some(Bson::Int32(value)) => i64::from(*value),
        Some(Bson::Int64(value)) => *value,
        Some(Bson::Double(value)) if value.is_finite() => value.trunc() as i64,
        _ => 0,
    }
}

fn window_bound(value: Option<&Bson>) -> Option<WindowBound> {
    match value {
        None | Some(Bson::Null) => None,
        Some(Bson::DateTime(at)) => Some(WindowBound::At(at.to_chrono())),
        Some(Bson::String(raw)) if raw.trim().is_empty() => None,
        Some(Bson::String(raw)) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map(|at| WindowBound::At(at.with_timezone(&Utc)))
                .unwrap_or_else(|_| WindowBound::Invalid(raw.clone())),
        ),
        Some(other) => Some(WindowBound::Invalid(other.to_string())),
    }
}

/// Serializes a campaign for audit entries, falling back to nothing.
pub fn to_document(campaign: &Campaign) -> Option<Document> {
    bson::to_document(campaign).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::doc;

    #[test]
    fn engagement_arithmetic_saturates() {
        let huge = CampaignSnapshot::from_document(&doc! { "reach": 1e300, "likes": -1e300 });
        assert_eq!(huge.engagement.reach, i64::MAX);
        assert_eq!(huge.engagement.likes, i64::MIN);

        let sum = huge.engagement + huge.engagement;
        let difference = huge.engagement - Engagement { reach: -1, clicks: 0, likes: 1 };

        assert_eq!(sum.reach, i64::MAX);
        assert_eq!(sum.likes, i64::MIN);
        assert_eq!(difference.reach, i64::MAX);
        assert_eq!(difference.likes, i64::MIN);
    }

    #[test]
    fn reads_well_formed_documents() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let document = doc! {
            "_id": "CPN-16E77539-8873-4C8A-BCA3-2036010474AD",
            "is_published": true,
            "start_at": "2024-05-01T12:00:00Z",
            "end_at": bson::DateTime::from_chrono(start),
            "reach": 10_i64,
            "clicks": 2_i32,
            "likes": 1.0,
        };

        let snapshot = CampaignSnapshot::from_document(&document);

        assert_eq!(
            snapshot,
            CampaignSnapshot {
                id: Some("CPN-16E77539-8873-4C8A-BCA3-2036010474AD".to_string()),
                is_published: true,
                start_at: Some(WindowBound::At(start)),
                end_at: Some(WindowBound::At(start)),
                engagement: Engagement {
                    reach: 10,
                    clicks: 2,
                    likes: 1,
                },
            }
        );
    }

    #[test]
    fn coerces_malformed_engagement_to_zero() {
        let document = doc! {
            "reach": "lots",
            "clicks": f64::NAN,
            "likes": Bson::Null,
        };

        let snapshot = CampaignSnapshot::from_document(&document);

        assert_eq!(snapshot.engagement, Engagement::default());
        assert!(!snapshot.is_published);
    }

    #[test]
    fn keeps_unparseable_bounds_as_invalid() {
        let document = doc! {
            "is_published": "yes",
            "start_at": "not a date",
            "end_at": "",
        };

        let snapshot = CampaignSnapshot::from_document(&document);

        assert!(!snapshot.is_published);
        assert_eq!(
            snapshot.start_at,
            Some(WindowBound::Invalid("not a date".to_string()))
        );
        assert_eq!(snapshot.end_at, None);
    }

    #[test]
    fn projection_selects_aggregable_fields() {
        let projection = CampaignSnapshot::projection();

        assert_eq!(projection.len(), SNAPSHOT_FIELDS.len());
        assert_eq!(projection.get_i32("reach").unwrap(), 1);
    }

    #[test]
    fn stored_campaign_reads_back_identically() {
        let mut campaign = crate::database::test::sample_campaign("Round Trip");
        campaign.is_published = true;
        campaign.start_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        campaign.reach = 5;

        let document = to_document(&campaign).unwrap();

        assert_eq!(
            CampaignSnapshot::from_document(&document),
            CampaignSnapshot::from(&campaign)
        );
    }
}
