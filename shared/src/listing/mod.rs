//! Marketplace Listing Domain
//!
//! This module provides the pure domain core of a crop listing:
//! - Value types: units, pricing, quality, harvest info, statistics
//! - Quantity ledger: the `available`/`reserved` pair and its mutation rules
//! - Lifecycle state machine: `active` / `inactive` / `sold_out` / `expired`
//! - Expiration policy: lazy eligibility evaluated against the clock

pub mod expiry;
pub mod ledger;
pub mod status;
pub mod types;

// Re-exports
pub use expiry::{is_eligible, is_expired, validity_window};
pub use ledger::{LedgerError, Quantity};
pub use status::{ListingStatus, TransitionError};
pub use types::{
    HarvestInfo, HarvestStatus, ListingStatistics, Pricing, Quality, QuantityUnit, Visibility,
};
