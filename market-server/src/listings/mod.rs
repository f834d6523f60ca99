//! Listing Lifecycle Module
//!
//! The lifecycle service is the only component that drives the quantity
//! ledger and the status state machine together:
//!
//! ```text
//! create_listing ── crop checks ──► Listing (active, expires_at set)
//!        │                              │
//!        ▼                              ▼
//!  crop back-pointer          reserve / release / reduce
//!  cross-service publish              │
//!  (both best-effort)                 ▼
//!                              available == 0 → sold_out (terminal)
//! ```
//!
//! Ledger mutations go through the repository's guarded updates and are
//! retried a bounded number of times when the storage engine reports a
//! write conflict.

pub mod service;

pub use service::{ListingError, ListingService};
