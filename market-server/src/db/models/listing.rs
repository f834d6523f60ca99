//! Listing Model
//!
//! The persisted marketplace listing aggregate. The embedded domain types
//! (quantity ledger, status, pricing, quality) live in the `shared` crate;
//! this model adds identity, ownership links, discovery fields and
//! timestamps.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use surrealdb::sql::Datetime;

use shared::listing::{
    HarvestInfo, ListingStatistics, ListingStatus, Pricing, Quality, Quantity, QuantityUnit,
    Visibility, expiry,
};

use super::serde_helpers;

pub type ListingId = RecordId;

/// Farm location used by the nearby discovery filter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Listing aggregate root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<ListingId>,
    /// Record link to the crop batch being sold (weak reference)
    #[serde(with = "serde_helpers::record_id")]
    pub crop: RecordId,
    /// Record link to the selling farmer (weak reference)
    #[serde(with = "serde_helpers::record_id")]
    pub farmer: RecordId,
    /// Crop name denormalized for discovery filters
    pub crop_name: String,
    #[serde(default)]
    pub description: String,
    /// The quantity ledger: `reserved <= available` at all times
    pub quantity: Quantity,
    pub pricing: Pricing,
    pub harvest_info: HarvestInfo,
    #[serde(default)]
    pub quality: Quality,
    #[serde(default)]
    pub images: Vec<String>,
    /// Lifecycle status; expiration is evaluated lazily against `expires_at`
    #[serde(default)]
    pub status: ListingStatus,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Discovery cutoff — eligible only while `status == active` AND
    /// `expires_at > now`
    pub expires_at: Datetime,
    #[serde(default)]
    pub statistics: ListingStatistics,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

impl Listing {
    /// Discovery eligibility: active AND not past its clock
    pub fn is_eligible(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        expiry::is_eligible(self.status, *self.expires_at, now)
    }

    /// Lazy expiry check — independent of the stored status
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        expiry::is_expired(*self.expires_at, now)
    }
}

/// Creation terms supplied by the farmer
///
/// Everything beyond quantity and price is optional; quality and harvest
/// data default from the crop record.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingCreate {
    pub crop_id: String,
    pub quantity: Decimal,
    /// Defaults to the crop's recorded unit
    pub unit: Option<QuantityUnit>,
    pub price_per_unit: Decimal,
    pub currency: Option<String>,
    pub negotiable: Option<bool>,
    pub minimum_order_quantity: Option<Decimal>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub grade: Option<String>,
    pub is_organic: Option<bool>,
    pub certifications: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
    /// Requested validity window in days, bounded 1–90; default 30
    pub validity_days: Option<i64>,
}

/// Allow-listed mutable fields
///
/// Identity, crop/farmer references and statistics are immutable through
/// this path. Status changes are routed through the state machine by the
/// lifecycle service, never written blindly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingUpdate {
    pub available: Option<Decimal>,
    pub price_per_unit: Option<Decimal>,
    pub currency: Option<String>,
    pub negotiable: Option<bool>,
    pub minimum_order_quantity: Option<Decimal>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub grade: Option<String>,
    pub is_organic: Option<bool>,
    pub certifications: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
    pub status: Option<ListingStatus>,
}

impl ListingUpdate {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.available.is_none()
            && self.price_per_unit.is_none()
            && self.currency.is_none()
            && self.negotiable.is_none()
            && self.minimum_order_quantity.is_none()
            && self.description.is_none()
            && self.images.is_none()
            && self.grade.is_none()
            && self.is_organic.is_none()
            && self.certifications.is_none()
            && self.visibility.is_none()
            && self.status.is_none()
    }
}

/// Aggregate statistics for the discovery surface
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogStats {
    pub total_listings: u64,
    pub active_listings: u64,
    pub organic_listings: u64,
    pub total_views: u64,
    pub total_inquiries: u64,
    pub total_orders: u64,
}
