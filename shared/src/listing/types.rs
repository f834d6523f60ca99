//! Listing value types
//!
//! Plain serde types embedded in the persisted listing aggregate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unit of measure for listed quantities
///
/// The ledger never converts between units — callers must convert
/// before mutating a listing whose stored unit differs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuantityUnit {
    #[default]
    Kg,
    Ton,
    Quintal,
}

/// Pricing terms for a listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pricing {
    /// Price per stored unit, must be positive
    pub price_per_unit: Decimal,
    /// ISO 4217 currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Whether the farmer accepts price negotiation
    #[serde(default)]
    pub negotiable: bool,
    /// Smallest quantity a buyer may order, in the stored unit
    #[serde(default)]
    pub minimum_order_quantity: Decimal,
}

fn default_currency() -> String {
    "INR".to_string()
}

/// Harvest progress of the underlying crop batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HarvestStatus {
    #[default]
    Ready,
    InProgress,
    Completed,
}

/// Harvest dates and progress carried on the listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarvestInfo {
    pub expected_harvest_date: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_harvest_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub harvest_status: HarvestStatus,
}

/// Quality attributes of the listed batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Quality {
    /// Grade label, e.g. "A", "premium"
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub is_organic: bool,
    /// Certification names, deduplicated
    #[serde(default)]
    pub certifications: Vec<String>,
    /// Health status copied from the crop at listing time
    #[serde(default)]
    pub health_status: String,
}

/// Who can discover a listing
///
/// Independent of lifecycle status — visibility filters discovery,
/// it never gates ledger or state machine operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    VerifiedBuyersOnly,
}

/// Interaction counters, monotonically increasing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ListingStatistics {
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub inquiries: u64,
    #[serde(default)]
    pub orders: u64,
}
