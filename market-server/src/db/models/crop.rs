//! Crop Model (collaborator)
//!
//! The crop is an external collaborator of the listing core: the service
//! reads growth stage, yield and metadata at listing time, and writes back
//! a single denormalized pointer for cross-navigation. Nothing else on the
//! crop is ever mutated here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use surrealdb::sql::Datetime;

use shared::listing::{ListingStatus, QuantityUnit};

use super::serde_helpers;

pub type CropId = RecordId;

/// Growth stage of a crop batch
///
/// Listings may only be created from `maturity` or `harvested`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    #[default]
    Planted,
    Growing,
    Maturity,
    Harvested,
}

impl GrowthStage {
    /// Whether a listing may be created at this stage
    pub fn is_sellable(self) -> bool {
        matches!(self, Self::Maturity | Self::Harvested)
    }
}

/// Denormalized marketplace pointer written onto the crop after listing
/// creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceListingRef {
    #[serde(with = "serde_helpers::record_id")]
    pub listing: RecordId,
    pub listed_date: Datetime,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub status: ListingStatus,
}

/// Crop record — read-only fields consumed by the listing core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crop {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<CropId>,
    pub name: String,
    #[serde(with = "serde_helpers::record_id")]
    pub farmer: RecordId,
    #[serde(default)]
    pub growth_stage: GrowthStage,
    /// Recorded yield once harvested; unknown while still in the field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_yield: Option<Decimal>,
    #[serde(default)]
    pub yield_unit: QuantityUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_harvest_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_harvest_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub soil_type: Option<String>,
    #[serde(default)]
    pub irrigation_method: Option<String>,
    #[serde(default)]
    pub health_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<super::GeoPoint>,
    /// Back-pointer to the active listing, if one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketplace_listing: Option<MarketplaceListingRef>,
}
