use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::typedid::{TypedId, TypedIdMarker};

pub mod db;
pub mod endpoints;
pub mod manager;
pub mod snapshot;
pub mod status;
pub use endpoints::*;
pub use snapshot::{CampaignSnapshot, Engagement, WindowBound};
pub use status::{classify, CampaignStatus};

pub type CampaignId = TypedId<Campaign>;

/// Largest accepted value of a single engagement field.
pub const MAX_ENGAGEMENT: i64 = 1_000_000_000_000;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum CampaignCategory {
    Brand,
    #[serde(rename = "UGC")]
    Ugc,
    Contest,
    Influencer,
    Awareness,
    #[default]
    Other,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Campaign {
    #[serde(rename = "_id")]
    pub id: CampaignId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: CampaignCategory,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reach: i64,
    #[serde(default)]
    pub clicks: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub modified_at: DateTime<Utc>,
}

impl TypedIdMarker for Campaign {
    fn tag() -> &'static str {
        "CPN"
    }
}

impl Campaign {
    pub fn status(&self, now: DateTime<Utc>) -> CampaignStatus {
        CampaignSnapshot::from(self).status(now)
    }

    pub fn apply(&mut self, changes: &CampaignChanges) {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(description) = &changes.description {
            self.description = Some(description.clone());
        }
        if let Some(category) = changes.category {
            self.category = category;
        }
        if let Some(visibility) = changes.visibility {
            self.visibility = visibility;
        }
        if let Some(start_at) = changes.start_at {
            self.start_at = Some(start_at);
        }
        if let Some(end_at) = changes.end_at {
            self.end_at = Some(end_at);
        }
        if let Some(reach) = changes.reach {
            self.reach = reach;
        }
        if let Some(clicks) = changes.clicks {
            self.clicks = clicks;
        }
        if let Some(likes) = changes.likes {
            self.likes = likes;
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |reason: &str| {
            Err(Error::InvalidCampaign {
                reason: reason.to_string(),
            })
        };

        if self.title.trim().is_empty() {
            return invalid("title must not be empty");
        }
        if self.reach < 0 || self.clicks < 0 || self.likes < 0 {
            return invalid("engagement values must not be negative");
        }
        if [self.reach, self.clicks, self.likes]
            .iter()
            .any(|value| *value > MAX_ENGAGEMENT)
        {
            return invalid("engagement values must not exceed 1000000000000");
        }
        if let (Some(start_at), Some(end_at)) = (self.start_at, self.end_at) {
            if end_at < start_at {
                return invalid("end_at must not be before start_at");
            }
        }

        Ok(())
    }
}

/// Partial update of the editable campaign fields. Serializes to a `$set`
/// document containing only the provided values.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct CampaignChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CampaignCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reach: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clicks: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<i64>,
}

/// Optional list filters. Status is derived at the time of listing.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct CampaignFilter {
    #[serde(default)]
    pub status: Option<CampaignStatus>,
    #[serde(default)]
    pub category: Option<CampaignCategory>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    /// Case-insensitive match on title or description.
    #[serde(default)]
    pub search: Option<String>,
}

impl CampaignFilter {
    pub fn matches(&self, campaign: &Campaign, now: DateTime<Utc>) -> bool {
        if self.category.map_or(false, |category| category != campaign.category) {
            return false;
        }
        if self
            .visibility
            .map_or(false, |visibility| visibility != campaign.visibility)
        {
            return false;
        }
        if self.status.map_or(false, |status| status != campaign.status(now)) {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            Some(search) if !search.is_empty() => {
                let search = search.to_lowercase();
                campaign.title.to_lowercase().contains(&search)
                    || campaign
                        .description
                        .as_deref()
                        .map_or(false, |description| {
                            description.to_lowercase().contains(&search)
                        })
            }
            _ => true,
        }
    }
}
