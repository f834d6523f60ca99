//! Persisted models
//!
//! - [`Listing`] — the marketplace listing aggregate
//! - [`Crop`] — the crop collaborator (read-side + back-pointer)

pub mod crop;
pub mod listing;
pub mod serde_helpers;

pub use crop::{Crop, CropId, GrowthStage, MarketplaceListingRef};
pub use listing::{
    CatalogStats, GeoPoint, Listing, ListingCreate, ListingId, ListingUpdate,
};
