//! Shared domain types for the AgriMarket platform
//!
//! Pure marketplace domain logic used by the server crate:
//! listing lifecycle, quantity ledger, and expiration policy.
//! No I/O lives here — everything is testable without a store.

pub mod listing;

// Re-exports
pub use listing::{
    HarvestInfo, HarvestStatus, LedgerError, ListingStatistics, ListingStatus, Pricing, Quality,
    Quantity, QuantityUnit, TransitionError, Visibility,
};
pub use serde::{Deserialize, Serialize};
