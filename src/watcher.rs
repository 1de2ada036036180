use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use mongodb::bson::Document;
use mongodb::change_stream::event::{ChangeStreamEvent, OperationType, ResumeToken};
use mongodb::options::{ChangeStreamOptions, FullDocumentBeforeChangeType, FullDocumentType};
use tokio::time;
use tracing::{error, info, warn};

use crate::audit::{self, AuditAction, AuditEntry};
use crate::campaign::{snapshot, CampaignSnapshot};
use crate::database::{Database, MongoDatabase};
use crate::error::Error;
use crate::stats::{self, ChangeEvent};

/// A campaign write as read from the change stream, before any parsing of
/// its images.
#[derive(Clone, Debug, PartialEq)]
pub struct RawChange {
    pub action: AuditAction,
    pub campaign_id: String,
    pub before: Option<Document>,
    pub after: Option<Document>,
}

impl RawChange {
    /// `None` for operations that are not campaign writes.
    pub fn from_event(event: ChangeStreamEvent<Document>) -> Option<RawChange> {
        let action = match event.operation_type {
            OperationType::Insert => AuditAction::Create,
            OperationType::Update | OperationType::Replace => AuditAction::Update,
            OperationType::Delete => AuditAction::Delete,
            _ => return None,
        };

        let campaign_id = event
            .document_key
            .as_ref()
            .and_then(|key| key.get("_id"))
            .map(snapshot::id_string)
            .unwrap_or_default();

        Some(RawChange {
            action,
            campaign_id,
            before: event.full_document_before_change,
            after: event.full_document,
        })
    }

    /// The change as the stats updater sees it, or `None` when an image it
    /// needs was not available.
    pub fn to_change_event(&self) -> Option<ChangeEvent> {
        let before = self.before.as_ref().map(CampaignSnapshot::from_document);
        let after = self.after.as_ref().map(CampaignSnapshot::from_document);

        match (self.action, before, after) {
            (AuditAction::Create, _, Some(after)) => Some(ChangeEvent::created(after)),
            (AuditAction::Update, Some(before), Some(after)) => {
                Some(ChangeEvent::updated(before, after))
            }
            (AuditAction::Delete, Some(before), _) => Some(ChangeEvent::deleted(before)),
            _ => None,
        }
    }
}

/// Applies one campaign write to the counters, then records it in the audit
/// log. Neither failure stops the watcher.
#[tracing::instrument(skip(db, change), fields(action = ?change.action, campaign_id = %change.campaign_id))]
pub async fn handle_change(db: &dyn Database, change: RawChange, now: DateTime<Utc>) {
    match change.to_change_event() {
        Some(event) => {
            if let Err(err) = stats::manager::apply_change(db, &event, now).await {
                error!(error = %err, "failed to apply campaign change to stats");
            }
        }
        None => warn!("skipping campaign change without the images it needs"),
    }

    let entry = AuditEntry::new(
        change.action,
        change.campaign_id,
        audit::SOURCE_WATCHER,
        now,
    )
    .with_images(change.before, change.after);
    audit::manager::record(db, entry).await;
}

/// Follows the campaigns change stream forever, reopening it after `retry`
/// from the last seen resume token whenever it fails or closes.
pub async fn watch_campaigns(db: MongoDatabase, retry: Duration) {
    let mut resume_token = None;

    loop {
        match follow(&db, &mut resume_token).await {
            Ok(()) => warn!("campaign change stream closed"),
            Err(err) => error!(error = %err, "campaign change stream failed"),
        }

        time::sleep(retry).await;
    }
}

async fn follow(db: &MongoDatabase, resume_token: &mut Option<ResumeToken>) -> Result<(), Error> {
    let options = ChangeStreamOptions::builder()
        .full_document(Some(FullDocumentType::WhenAvailable))
        .full_document_before_change(Some(FullDocumentBeforeChangeType::WhenAvailable))
        .resume_after(resume_token.clone())
        .build();

    let mut stream = db.campaign_documents().watch(Vec::<Document>::new(), options).await?;
    info!(resumed = resume_token.is_some(), "watching campaign changes");

    while let Some(event) = stream.next().await {
        let event = event?;
        if let Some(change) = RawChange::from_event(event) {
            handle_change(db, change, Utc::now()).await;
        }
        *resume_token = stream.resume_token();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test::{InMemory, MockDatabase};
    use mongodb::bson::doc;
    use std::sync::{Arc, Mutex};

    fn change(action: AuditAction, before: Option<Document>, after: Option<Document>) -> RawChange {
        RawChange {
            action,
            campaign_id: "CPN-1".to_string(),
            before,
            after,
        }
    }

    #[test]
    fn update_without_pre_image_is_skipped() {
        let raw = change(AuditAction::Update, None, Some(doc! { "reach": 3 }));

        assert_eq!(raw.to_change_event(), None);
    }

    #[test]
    fn delete_only_needs_pre_image() {
        let raw = change(AuditAction::Delete, Some(doc! { "_id": "CPN-1", "likes": 2 }), None);

        let event = raw.to_change_event().unwrap();

        assert!(event.after.is_none());
        assert_eq!(event.before.unwrap().engagement.likes, 2);
    }

    #[tokio::test]
    async fn handled_changes_reach_stats_and_audit() {
        let memory = InMemory::default();
        let mut db = memory.database();
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let recorded_clone = Arc::clone(&recorded);
        db.audit_logs.on_insert_audit_entry = Box::new(move |entry| {
            recorded_clone.lock().unwrap().push(entry.clone());
            Ok(())
        });
        let now = Utc::now();

        handle_change(
            &db,
            change(
                AuditAction::Create,
                None,
                Some(doc! { "_id": "CPN-1", "is_published": true, "reach": 10 }),
            ),
            now,
        )
        .await;
        handle_change(
            &db,
            change(
                AuditAction::Update,
                Some(doc! { "_id": "CPN-1", "is_published": true, "reach": 10 }),
                Some(doc! { "_id": "CPN-1", "is_published": false, "reach": 4 }),
            ),
            now,
        )
        .await;

        let stats = memory.stats().unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.statuses.active, 0);
        assert_eq!(stats.statuses.draft, 1);
        assert_eq!(stats.engagement.reach, 4);

        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[1].action, AuditAction::Update);
        assert_eq!(recorded[1].source, audit::SOURCE_WATCHER);
    }

    #[tokio::test]
    async fn skipped_change_is_still_audited() {
        let mut db = MockDatabase::new();
        let recorded = Arc::new(Mutex::new(0));
        let recorded_clone = Arc::clone(&recorded);
        db.audit_logs.on_insert_audit_entry = Box::new(move |_| {
            *recorded_clone.lock().unwrap() += 1;
            Ok(())
        });

        handle_change(&db, change(AuditAction::Delete, None, None), Utc::now()).await;

        assert_eq!(*recorded.lock().unwrap(), 1);
    }
}
