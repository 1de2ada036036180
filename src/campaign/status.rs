use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::WindowBound;

/// Lifecycle status derived from the publish flag and schedule window. The
/// four variants partition every campaign.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Active,
    Completed,
}

impl CampaignStatus {
    pub const ALL: [CampaignStatus; 4] = [
        CampaignStatus::Draft,
        CampaignStatus::Scheduled,
        CampaignStatus::Active,
        CampaignStatus::Completed,
    ];

    /// Name of the counter field in the stats document.
    pub fn field_name(self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Active => "active",
            CampaignStatus::Completed => "completed",
        }
    }
}

/// Classifies a campaign at `now`.
///
/// Unpublished campaigns are drafts. A published campaign is scheduled until
/// its start, completed after its end, and active otherwise, including when
/// either bound is missing. A bound that could not be parsed makes the
/// campaign a draft.
pub fn classify(
    published: bool,
    start_at: Option<&WindowBound>,
    end_at: Option<&WindowBound>,
    now: DateTime<Utc>,
) -> CampaignStatus {
    if !published {
        return CampaignStatus::Draft;
    }

    let (start_at, end_at) = match (instant(start_at, "start_at"), instant(end_at, "end_at")) {
        (Some(start_at), Some(end_at)) => (start_at, end_at),
        _ => return CampaignStatus::Draft,
    };

    match (start_at, end_at) {
        (Some(start_at), _) if now < start_at => CampaignStatus::Scheduled,
        (_, Some(end_at)) if now > end_at => CampaignStatus::Completed,
        _ => CampaignStatus::Active,
    }
}

// outer None means the bound was present but unusable
fn instant(bound: Option<&WindowBound>, field: &str) -> Option<Option<DateTime<Utc>>> {
    match bound {
        None => Some(None),
        Some(WindowBound::At(at)) => Some(Some(*at)),
        Some(WindowBound::Invalid(raw)) => {
            warn!(field, raw = %raw, "unparseable campaign window bound, classifying as draft");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(time: DateTime<Utc>) -> Option<WindowBound> {
        Some(WindowBound::At(time))
    }

    #[test]
    fn unpublished_is_always_draft() {
        let now = Utc::now();
        let start = at(now - Duration::hours(1));
        let end = at(now + Duration::hours(1));

        assert_eq!(
            classify(false, start.as_ref(), end.as_ref(), now),
            CampaignStatus::Draft
        );
        assert_eq!(classify(false, None, None, now), CampaignStatus::Draft);
    }

    #[test]
    fn published_follows_the_window() {
        let now = Utc::now();
        let past = at(now - Duration::hours(2));
        let recent = at(now - Duration::hours(1));
        let soon = at(now + Duration::hours(1));
        let later = at(now + Duration::hours(2));

        assert_eq!(
            classify(true, soon.as_ref(), later.as_ref(), now),
            CampaignStatus::Scheduled
        );
        assert_eq!(
            classify(true, recent.as_ref(), soon.as_ref(), now),
            CampaignStatus::Active
        );
        assert_eq!(
            classify(true, past.as_ref(), recent.as_ref(), now),
            CampaignStatus::Completed
        );
    }

    #[test]
    fn window_edges_are_active() {
        let now = Utc::now();
        let edge = at(now);

        assert_eq!(
            classify(true, edge.as_ref(), edge.as_ref(), now),
            CampaignStatus::Active
        );
    }

    #[test]
    fn missing_bounds_default_to_active() {
        let now = Utc::now();
        let recent = at(now - Duration::hours(1));
        let soon = at(now + Duration::hours(1));

        assert_eq!(classify(true, None, None, now), CampaignStatus::Active);
        assert_eq!(classify(true, recent.as_ref(), None, now), CampaignStatus::Active);
        assert_eq!(classify(true, None, soon.as_ref(), now), CampaignStatus::Active);
        assert_eq!(
            classify(true, soon.as_ref(), None, now),
            CampaignStatus::Scheduled
        );
        assert_eq!(
            classify(true, None, recent.as_ref(), now),
            CampaignStatus::Completed
        );
    }

    #[test]
    fn invalid_bounds_fall_back_to_draft() {
        let now = Utc::now();
        let garbage = Some(WindowBound::Invalid("next tuesday".to_string()));
        let soon = at(now + Duration::hours(1));

        assert_eq!(
            classify(true, garbage.as_ref(), soon.as_ref(), now),
            CampaignStatus::Draft
        );
        assert_eq!(
            classify(true, None, garbage.as_ref(), now),
            CampaignStatus::Draft
        );
    }

    #[test]
    fn field_names_are_distinct() {
        let mut names: Vec<_> = CampaignStatus::ALL.iter().map(|s| s.field_name()).collect();
        names.sort_unstable();
        names.dedup();

        assert_eq!(names.len(), CampaignStatus::ALL.len());
    }
}
