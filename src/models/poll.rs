use chrono::{DateTime, Duration, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};

/// A question open for voting between `publish_at` and `close_at`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Poll {
    pub id: String,
    pub text: String,
    pub publish_at: DateTime<Utc>,
    /// `None` means the poll never closes.
    pub close_at: Option<DateTime<Utc>>,
}

impl Poll {
    pub fn new(text: String, publish_at: DateTime<Utc>, close_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: nanoid!(),
            text,
            publish_at,
            close_at,
        }
    }

    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        now >= self.publish_at
    }

    /// Voting window is `[publish_at, close_at)`; the close bound is exclusive.
    pub fn can_vote(&self, now: DateTime<Utc>) -> bool {
        self.publish_at <= now && self.close_at.map_or(true, |close_at| now < close_at)
    }

    /// `now - 1 day <= publish_at <= now`, both ends inclusive.
    pub fn was_published_recently(&self, now: DateTime<Utc>) -> bool {
        now - Duration::days(1) <= self.publish_at && self.publish_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(publish_at: DateTime<Utc>, close_at: Option<DateTime<Utc>>) -> Poll {
        Poll::new("What's up?".to_string(), publish_at, close_at)
    }

    #[test]
    fn test_was_published_recently_with_future_poll() {
        let now = Utc::now();
        assert!(!poll(now + Duration::days(30), None).was_published_recently(now));
    }

    #[test]
    fn test_was_published_recently_with_old_poll() {
        let now = Utc::now();
        let old = poll(now - Duration::days(1) - Duration::seconds(1), None);
        assert!(!old.was_published_recently(now));
    }

    #[test]
    fn test_was_published_recently_with_recent_poll() {
        let now = Utc::now();
        let recent = poll(
            now - Duration::hours(23) - Duration::minutes(59) - Duration::seconds(59),
            None,
        );
        assert!(recent.was_published_recently(now));
    }

    #[test]
    fn test_was_published_recently_bounds_are_inclusive() {
        let now = Utc::now();
        assert!(poll(now, None).was_published_recently(now));
        assert!(poll(now - Duration::days(1), None).was_published_recently(now));
    }

    #[test]
    fn test_is_published() {
        let now = Utc::now();
        assert!(!poll(now + Duration::days(1), None).is_published(now));
        assert!(poll(now, None).is_published(now));
        assert!(poll(now - Duration::days(1), None).is_published(now));
    }

    #[test]
    fn test_can_vote_before_publish_ignores_close() {
        let now = Utc::now();
        let publish_at = now + Duration::hours(1);
        for close_at in [None, Some(now + Duration::days(2)), Some(now - Duration::days(2))] {
            assert!(!poll(publish_at, close_at).can_vote(now));
        }
    }

    #[test]
    fn test_can_vote_with_future_close() {
        let now = Utc::now();
        let open = poll(now - Duration::days(2), Some(now + Duration::days(2)));
        assert!(open.can_vote(now));
    }

    #[test]
    fn test_can_vote_with_past_close() {
        let now = Utc::now();
        let closed = poll(now - Duration::days(3), Some(now - Duration::days(1)));
        assert!(!closed.can_vote(now));
    }

    #[test]
    fn test_can_vote_close_bound_is_exclusive() {
        let now = Utc::now();
        let close_at = now + Duration::days(1);
        let p = poll(now - Duration::days(1), Some(close_at));
        assert!(!p.can_vote(close_at));
        assert!(p.can_vote(close_at - Duration::milliseconds(1)));
    }

    #[test]
    fn test_can_vote_with_no_close() {
        let publish_at = Utc::now();
        let p = poll(publish_at, None);
        for offset in [0, 1, 3_600, 86_400 * 365 * 10] {
            assert!(p.can_vote(publish_at + Duration::seconds(offset)));
        }
    }
}
