//! # Publish Window
//!
//! Visibility of content items, derived from their three publish timestamps.
//! Only `published_at` and `unpublished_at` decide visibility; `to_publish_at`
//! is a schedule that something outside this crate promotes into
//! `published_at` (see [`due_for_promotion`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display status of a content item at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    /// Never published and nothing scheduled.
    Draft,
    /// Waiting for a future `to_publish_at` or `published_at`.
    Scheduled,
    Published,
    /// The window has closed.
    Unpublished,
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PublishStatus::Draft => "draft",
            PublishStatus::Scheduled => "scheduled",
            PublishStatus::Published => "published",
            PublishStatus::Unpublished => "unpublished",
        };
        f.write_str(s)
    }
}

/// Visible when `published_at <= now` and the window has not closed yet.
///
/// `to_publish_at` is accepted for symmetry with the stored columns and
/// ignored: a schedule alone never makes content visible.
pub fn is_visible(
    now: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    unpublished_at: Option<DateTime<Utc>>,
    _to_publish_at: Option<DateTime<Utc>>,
) -> bool {
    match published_at {
        Some(published) if now >= published => unpublished_at.is_none_or(|closed| now < closed),
        _ => false,
    }
}

pub fn publish_status(
    now: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    unpublished_at: Option<DateTime<Utc>>,
    to_publish_at: Option<DateTime<Utc>>,
) -> PublishStatus {
    if is_visible(now, published_at, unpublished_at, to_publish_at) {
        return PublishStatus::Published;
    }
    if unpublished_at.is_some_and(|closed| now >= closed) {
        return PublishStatus::Unpublished;
    }
    let pending = |at: Option<DateTime<Utc>>| at.is_some_and(|t| t > now);
    if pending(published_at) || pending(to_publish_at) {
        return PublishStatus::Scheduled;
    }
    PublishStatus::Draft
}

/// A schedule has come due and the item has not been published yet.
pub fn due_for_promotion(
    now: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    to_publish_at: Option<DateTime<Utc>>,
) -> bool {
    published_at.is_none() && to_publish_at.is_some_and(|t| t <= now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_visible_inside_window() {
        assert!(is_visible(t(5), Some(t(1)), None, None));
        assert!(is_visible(t(1), Some(t(1)), Some(t(10)), None));
        assert!(!is_visible(t(10), Some(t(1)), Some(t(10)), None));
        assert!(!is_visible(t(1) - Duration::seconds(1), Some(t(1)), None, None));
    }

    #[test]
    fn test_schedule_alone_is_not_visible() {
        assert!(!is_visible(t(20), None, None, Some(t(2))));
        assert!(!is_visible(t(1), None, None, Some(t(2))));
    }

    /// Once visible with no close date, content stays visible.
    #[test]
    fn test_visibility_is_monotonic_without_close() {
        let published = Some(t(3));
        let mut was_visible = false;
        for hour in 0..(24 * 20) {
            let now = t(1) + Duration::hours(hour);
            let visible = is_visible(now, published, None, Some(t(2)));
            assert!(!(was_visible && !visible), "visibility dropped at {now}");
            was_visible |= visible;
        }
        assert!(was_visible);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(publish_status(t(5), None, None, None), PublishStatus::Draft);
        assert_eq!(publish_status(t(5), None, None, Some(t(6))), PublishStatus::Scheduled);
        assert_eq!(publish_status(t(5), Some(t(6)), None, None), PublishStatus::Scheduled);
        assert_eq!(publish_status(t(5), Some(t(1)), None, None), PublishStatus::Published);
        assert_eq!(publish_status(t(5), Some(t(1)), Some(t(4)), None), PublishStatus::Unpublished);
        // An overdue schedule that nobody promoted is still a draft.
        assert_eq!(publish_status(t(5), None, None, Some(t(4))), PublishStatus::Draft);
    }

    #[test]
    fn test_due_for_promotion() {
        assert!(due_for_promotion(t(5), None, Some(t(5))));
        assert!(!due_for_promotion(t(4), None, Some(t(5))));
        assert!(!due_for_promotion(t(6), Some(t(1)), Some(t(5))));
        assert!(!due_for_promotion(t(6), None, None));
    }
}
