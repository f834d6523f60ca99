//! Expiration policy
//!
//! Expiration is a pure function of `(status, expires_at, now)` — there is
//! no sweeper writing `expired` back to storage. Every read path re-checks
//! the clock, so a stored `active` status lagging reality is harmless.

use chrono::{DateTime, Duration, Utc};

use super::status::ListingStatus;

/// Validity window applied when the caller does not request one
pub const DEFAULT_VALIDITY_DAYS: i64 = 30;

/// Caller-requested validity windows are bounded to this range
pub const MIN_VALIDITY_DAYS: i64 = 1;
pub const MAX_VALIDITY_DAYS: i64 = 90;

/// `expires_at < now` — the listing's clock has passed
pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at < now
}

/// Discovery eligibility: `status == active` AND `expires_at > now`
///
/// Both predicates are independent; stored status alone is never enough.
pub fn is_eligible(status: ListingStatus, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    status == ListingStatus::Active && expires_at > now
}

/// Validity window for a new listing: requested-or-default, bounded 1–90 days
pub fn validity_window(requested_days: Option<i64>) -> Duration {
    let days = requested_days
        .unwrap_or(DEFAULT_VALIDITY_DAYS)
        .clamp(MIN_VALIDITY_DAYS, MAX_VALIDITY_DAYS);
    Duration::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_one_second_ago() {
        let now = Utc::now();
        assert!(is_expired(now - Duration::seconds(1), now));
        assert!(!is_expired(now + Duration::seconds(1), now));
    }

    #[test]
    fn eligibility_requires_both_predicates() {
        let now = Utc::now();
        let future = now + Duration::days(1);
        let past = now - Duration::seconds(1);

        assert!(is_eligible(ListingStatus::Active, future, now));
        // active in storage but past its clock — excluded
        assert!(!is_eligible(ListingStatus::Active, past, now));
        assert!(!is_eligible(ListingStatus::Inactive, future, now));
        assert!(!is_eligible(ListingStatus::SoldOut, future, now));
    }

    #[test]
    fn validity_window_defaults_and_bounds() {
        assert_eq!(validity_window(None), Duration::days(30));
        assert_eq!(validity_window(Some(45)), Duration::days(45));
        assert_eq!(validity_window(Some(0)), Duration::days(1));
        assert_eq!(validity_window(Some(400)), Duration::days(90));
    }
}
