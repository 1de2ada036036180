use chrono::{DateTime, Utc};
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

use crate::typedid::{TypedId, TypedIdMarker};
use crate::user::UserId;

pub mod db;
pub mod endpoints;
pub mod manager;
pub use endpoints::*;

pub type AuditEntryId = TypedId<AuditEntry>;

/// Source of entries written by the change-stream watcher.
pub const SOURCE_WATCHER: &str = "watcher";
/// Source of entries written by request handlers.
pub const SOURCE_API: &str = "api";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Publish,
    Unpublish,
    HardDelete,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AuditEntry {
    #[serde(rename = "_id")]
    pub id: AuditEntryId,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub at: DateTime<Utc>,
    pub action: AuditAction,
    /// Kept as written so entries survive ids that are not `CPN-` ids.
    pub campaign_id: String,
    #[serde(default)]
    pub actor: Option<UserId>,
    #[serde(default)]
    pub before: Option<Document>,
    #[serde(default)]
    pub after: Option<Document>,
    pub source: String,
}

impl TypedIdMarker for AuditEntry {
    fn tag() -> &'static str {
        "AUD"
    }
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        campaign_id: impl Into<String>,
        source: &str,
        now: DateTime<Utc>,
    ) -> AuditEntry {
        AuditEntry {
            id: AuditEntryId::new(),
            at: now,
            action,
            campaign_id: campaign_id.into(),
            actor: None,
            before: None,
            after: None,
            source: source.to_string(),
        }
    }

    pub fn by(mut self, actor: UserId) -> AuditEntry {
        self.actor = Some(actor);
        self
    }

    pub fn with_images(mut self, before: Option<Document>, after: Option<Document>) -> AuditEntry {
        self.before = before;
        self.after = after;
        self
    }
}
