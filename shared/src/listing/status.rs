//! Listing lifecycle state machine
//!
//! Legal transitions:
//!
//! ```text
//! active   → inactive | sold_out | expired
//! inactive → active | sold_out
//! sold_out → ∅   (terminal)
//! expired  → ∅   (terminal)
//! ```
//!
//! Expiration is never an active transition — it is evaluated lazily on
//! read against `expires_at` (see [`super::expiry`]). A stored status of
//! `active` can therefore lag reality once the clock has passed; callers
//! must AND the stored status with the expiry check, never conflate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::expiry;

/// Lifecycle status of a listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    #[default]
    Active,
    Inactive,
    SoldOut,
    Expired,
}

/// A rejected state transition, carrying the specific blocking reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("listing is sold out")]
    SoldOut,

    #[error("listing has expired")]
    Expired,

    #[error("illegal transition from {from:?}")]
    Illegal { from: ListingStatus },
}

impl ListingStatus {
    /// Terminal states have no outgoing transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::SoldOut | Self::Expired)
    }

    /// `active | inactive → inactive`; idempotent from `inactive`
    pub fn deactivate(self) -> Result<Self, TransitionError> {
        match self {
            Self::Active | Self::Inactive => Ok(Self::Inactive),
            Self::SoldOut => Err(TransitionError::SoldOut),
            Self::Expired => Err(TransitionError::Expired),
        }
    }

    /// `inactive → active`, blocked by sold-out and by the clock
    ///
    /// The expiry check runs against `expires_at`, not the stored status:
    /// a listing still stored as `active` or `inactive` whose clock has
    /// passed is rejected with [`TransitionError::Expired`].
    pub fn reactivate(
        self,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, TransitionError> {
        match self {
            Self::SoldOut => Err(TransitionError::SoldOut),
            Self::Expired => Err(TransitionError::Expired),
            Self::Active | Self::Inactive => {
                if expiry::is_expired(expires_at, now) {
                    Err(TransitionError::Expired)
                } else {
                    Ok(Self::Active)
                }
            }
        }
    }

    /// `active | inactive → sold_out`, signaled by the ledger at zero
    pub fn mark_sold_out(self) -> Result<Self, TransitionError> {
        match self {
            Self::Active | Self::Inactive => Ok(Self::SoldOut),
            Self::SoldOut => Ok(Self::SoldOut),
            Self::Expired => Err(TransitionError::Illegal { from: self }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn future() -> DateTime<Utc> {
        Utc::now() + Duration::days(7)
    }

    fn past() -> DateTime<Utc> {
        Utc::now() - Duration::seconds(1)
    }

    #[test]
    fn deactivate_is_idempotent_from_inactive() {
        assert_eq!(
            ListingStatus::Active.deactivate().unwrap(),
            ListingStatus::Inactive
        );
        assert_eq!(
            ListingStatus::Inactive.deactivate().unwrap(),
            ListingStatus::Inactive
        );
    }

    #[test]
    fn terminal_states_reject_deactivate() {
        assert_eq!(
            ListingStatus::SoldOut.deactivate().unwrap_err(),
            TransitionError::SoldOut
        );
        assert_eq!(
            ListingStatus::Expired.deactivate().unwrap_err(),
            TransitionError::Expired
        );
    }

    #[test]
    fn reactivate_from_inactive_before_expiry() {
        let now = Utc::now();
        assert_eq!(
            ListingStatus::Inactive.reactivate(future(), now).unwrap(),
            ListingStatus::Active
        );
    }

    #[test]
    fn reactivate_blocked_by_sold_out() {
        let now = Utc::now();
        assert_eq!(
            ListingStatus::SoldOut.reactivate(future(), now).unwrap_err(),
            TransitionError::SoldOut
        );
    }

    #[test]
    fn reactivate_checks_clock_not_stored_status() {
        // stored status still reads active, but the clock has passed
        let now = Utc::now();
        assert_eq!(
            ListingStatus::Active.reactivate(past(), now).unwrap_err(),
            TransitionError::Expired
        );
        assert_eq!(
            ListingStatus::Inactive.reactivate(past(), now).unwrap_err(),
            TransitionError::Expired
        );
    }

    #[test]
    fn sold_out_is_terminal() {
        assert!(ListingStatus::SoldOut.is_terminal());
        assert!(
            ListingStatus::SoldOut
                .reactivate(future(), Utc::now())
                .is_err()
        );
    }

    #[test]
    fn wire_format_matches_storage_literals() {
        // query guards compare against these exact strings
        assert_eq!(
            serde_json::to_string(&ListingStatus::SoldOut).unwrap(),
            "\"sold_out\""
        );
        assert_eq!(
            serde_json::from_str::<ListingStatus>("\"inactive\"").unwrap(),
            ListingStatus::Inactive
        );
    }

    #[test]
    fn mark_sold_out_from_active_and_inactive() {
        assert_eq!(
            ListingStatus::Active.mark_sold_out().unwrap(),
            ListingStatus::SoldOut
        );
        assert_eq!(
            ListingStatus::Inactive.mark_sold_out().unwrap(),
            ListingStatus::SoldOut
        );
        assert!(ListingStatus::Expired.mark_sold_out().is_err());
    }
}
