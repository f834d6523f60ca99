//! ListingService — listing lifecycle orchestration
//!
//! The single entry point for every mutation of a listing: creation from a
//! harvested crop, terms updates, status transitions and the three ledger
//! operations. Read paths (catalog search, get-by-id) go straight to the
//! repository — they carry no invariants.

use chrono::Utc;
use rust_decimal::Decimal;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use surrealdb::sql::Datetime;
use thiserror::Error;

use shared::listing::{
    HarvestInfo, HarvestStatus, LedgerError, ListingStatistics, ListingStatus, Pricing, Quality,
    Quantity, TransitionError, Visibility, expiry,
};

use crate::db::models::{
    Crop, GrowthStage, Listing, ListingCreate, ListingUpdate, MarketplaceListingRef,
};
use crate::db::repository::{CropRepository, ListingRepository, RepoError};
use crate::services::MarketplacePublisher;
use crate::utils::AppError;

/// Bounded retries for ledger mutations hitting engine write conflicts
const MAX_LEDGER_RETRIES: u32 = 3;

/// Bounded re-evaluations when a status transition races another writer
const MAX_TRANSITION_ATTEMPTS: u32 = 3;

/// Lifecycle service errors
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Listing not found: {0}")]
    ListingNotFound(String),

    #[error("Crop not found: {0}")]
    CropNotFound(String),

    #[error("Insufficient quantity")]
    InsufficientQuantity,

    #[error("Invalid transition: {0}")]
    InvalidTransition(TransitionError),

    #[error("An active listing already exists for this crop and farmer")]
    DuplicateActiveListing,

    #[error("Crop is not ready for sale (growth stage: {stage:?})")]
    CropNotReady { stage: GrowthStage },

    #[error("Requested quantity {requested} exceeds recorded yield {actual_yield}")]
    QuantityExceedsYield {
        requested: Decimal,
        actual_yield: Decimal,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Concurrent update conflict, retries exhausted")]
    Conflict,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepoError> for ListingError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => ListingError::ListingNotFound(msg),
            RepoError::Duplicate(_) => ListingError::DuplicateActiveListing,
            RepoError::InsufficientQuantity(_) => ListingError::InsufficientQuantity,
            RepoError::Conflict(_) => ListingError::Conflict,
            RepoError::Validation(msg) => ListingError::Validation(msg),
            RepoError::Database(msg) => ListingError::Storage(msg),
        }
    }
}

impl From<LedgerError> for ListingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientQuantity { .. } => ListingError::InsufficientQuantity,
            LedgerError::NonPositiveAmount(v) => {
                ListingError::Validation(format!("amount must be positive, got {v}"))
            }
        }
    }
}

impl From<ListingError> for AppError {
    fn from(err: ListingError) -> Self {
        match &err {
            ListingError::ListingNotFound(_) | ListingError::CropNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            ListingError::InsufficientQuantity
            | ListingError::InvalidTransition(_)
            | ListingError::CropNotReady { .. }
            | ListingError::QuantityExceedsYield { .. } => AppError::BusinessRule(err.to_string()),
            ListingError::DuplicateActiveListing | ListingError::Conflict => {
                AppError::Conflict(err.to_string())
            }
            ListingError::Validation(msg) => AppError::Validation(msg.clone()),
            ListingError::Storage(msg) => AppError::Database(msg.clone()),
        }
    }
}

pub type ListingResult<T> = Result<T, ListingError>;

/// Listing lifecycle service
#[derive(Clone)]
pub struct ListingService {
    listings: ListingRepository,
    crops: CropRepository,
    publisher: Option<MarketplacePublisher>,
    default_validity_days: i64,
}

impl ListingService {
    pub fn new(
        db: Surreal<Db>,
        publisher: Option<MarketplacePublisher>,
        default_validity_days: i64,
    ) -> Self {
        Self {
            listings: ListingRepository::new(db.clone()),
            crops: CropRepository::new(db),
            publisher,
            default_validity_days,
        }
    }

    async fn load(&self, id: &str) -> ListingResult<Listing> {
        self.listings
            .find_by_id(id)
            .await?
            .ok_or_else(|| ListingError::ListingNotFound(id.to_string()))
    }

    /// Create a listing from a harvested crop
    ///
    /// Preconditions:
    /// - crop exists and belongs to the calling farmer
    /// - growth stage is `maturity` or `harvested`
    /// - requested quantity does not exceed the recorded yield, when known
    /// - no other `active` listing exists for this (crop, farmer) pair
    pub async fn create_listing(
        &self,
        farmer_id: &str,
        data: ListingCreate,
    ) -> ListingResult<Listing> {
        if data.quantity <= Decimal::ZERO {
            return Err(ListingError::Validation(
                "quantity must be positive".to_string(),
            ));
        }
        if data.price_per_unit <= Decimal::ZERO {
            return Err(ListingError::Validation(
                "price_per_unit must be positive".to_string(),
            ));
        }
        if let Some(moq) = data.minimum_order_quantity
            && moq < Decimal::ZERO
        {
            return Err(ListingError::Validation(
                "minimum_order_quantity must not be negative".to_string(),
            ));
        }

        let crop = self
            .crops
            .find_by_id(&data.crop_id)
            .await
            .map_err(map_crop_error)?
            .ok_or_else(|| ListingError::CropNotFound(data.crop_id.clone()))?;

        let farmer = crate::db::repository::parse_record_id("farmer", farmer_id)
            .map_err(|e| ListingError::Validation(e.to_string()))?;
        // Ownership mismatch is reported as not-found to avoid leaking
        // other farmers' crop ids
        if crop.farmer != farmer {
            return Err(ListingError::CropNotFound(data.crop_id.clone()));
        }

        if !crop.growth_stage.is_sellable() {
            return Err(ListingError::CropNotReady {
                stage: crop.growth_stage,
            });
        }

        if let Some(actual_yield) = crop.actual_yield
            && data.quantity > actual_yield
        {
            return Err(ListingError::QuantityExceedsYield {
                requested: data.quantity,
                actual_yield,
            });
        }

        let now = Utc::now();
        let validity = expiry::validity_window(
            data.validity_days.or(Some(self.default_validity_days)),
        );
        let listing = build_listing(&crop, farmer_id, &data, now, validity)?;

        let created = self
            .listings
            .create_unique(listing)
            .await
            .map_err(ListingError::from)?;

        self.write_crop_back_pointer(&data.crop_id, &created).await;
        self.publish_best_effort(&created);

        Ok(created)
    }

    /// Denormalized pointer for crop → listing navigation; a failure here
    /// never rolls back the created listing
    async fn write_crop_back_pointer(&self, crop_id: &str, listing: &Listing) {
        let Some(listing_id) = listing.id.clone() else {
            return;
        };
        let listing_ref = MarketplaceListingRef {
            listing: listing_id,
            listed_date: listing.created_at.clone(),
            quantity: listing.quantity.available,
            price_per_unit: listing.pricing.price_per_unit,
            status: listing.status,
        };
        if let Err(e) = self
            .crops
            .set_marketplace_listing(crop_id, listing_ref)
            .await
        {
            tracing::warn!(crop = crop_id, error = %e, "failed to write crop back-pointer");
        }
    }

    /// Mirror the listing into the external marketplace catalog,
    /// best-effort on a detached task
    fn publish_best_effort(&self, listing: &Listing) {
        let Some(publisher) = self.publisher.clone() else {
            return;
        };
        let listing = listing.clone();
        tokio::spawn(async move {
            if let Err(e) = publisher.publish(&listing).await {
                tracing::warn!(error = %e, "cross-service publish failed (local listing unaffected)");
            }
        });
    }

    /// Record a buyer inquiry — counter only, no ledger effect
    ///
    /// Requires the listing to be currently eligible; an ineligible or
    /// missing listing both surface as not-found.
    pub async fn record_inquiry(&self, id: &str) -> ListingResult<Listing> {
        self.listings
            .record_inquiry(id)
            .await?
            .ok_or_else(|| ListingError::ListingNotFound(id.to_string()))
    }

    /// Allow-listed terms update
    ///
    /// A requested status change is routed through the state machine
    /// (deactivate / reactivate semantics), never written blindly, and
    /// is applied before the field changes so a blocked transition
    /// leaves the terms untouched.
    pub async fn update_terms(&self, id: &str, mut data: ListingUpdate) -> ListingResult<Listing> {
        if let Some(available) = data.available
            && available < Decimal::ZERO
        {
            return Err(ListingError::Validation(
                "available must not be negative".to_string(),
            ));
        }
        if let Some(price) = data.price_per_unit
            && price <= Decimal::ZERO
        {
            return Err(ListingError::Validation(
                "price_per_unit must be positive".to_string(),
            ));
        }

        let transitioned = match data.status.take() {
            None => None,
            Some(ListingStatus::Active) => Some(self.reactivate(id).await?),
            Some(ListingStatus::Inactive) => Some(self.deactivate(id).await?),
            Some(other) => {
                return Err(ListingError::Validation(format!(
                    "status {other:?} cannot be requested directly"
                )));
            }
        };

        if !data.is_empty() {
            return Ok(self.listings.update(id, data).await?);
        }
        match transitioned {
            Some(listing) => Ok(listing),
            None => self.load(id).await,
        }
    }

    /// `active | inactive → inactive`; idempotent no-op when already inactive
    pub async fn deactivate(&self, id: &str) -> ListingResult<Listing> {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let listing = self.load(id).await?;
            let target = listing
                .status
                .deactivate()
                .map_err(ListingError::InvalidTransition)?;
            if listing.status == target {
                return Ok(listing);
            }
            let updated = self
                .listings
                .set_status(
                    id,
                    target,
                    &[ListingStatus::Active, ListingStatus::Inactive],
                )
                .await?;
            if let Some(updated) = updated {
                return Ok(updated);
            }
            // lost a race against another transition, re-evaluate
        }
        Err(ListingError::Conflict)
    }

    /// `inactive → active`, surfacing the specific blocking reason
    /// (`sold_out` vs expired) on failure
    pub async fn reactivate(&self, id: &str) -> ListingResult<Listing> {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let listing = self.load(id).await?;
            let target = listing
                .status
                .reactivate(*listing.expires_at, Utc::now())
                .map_err(ListingError::InvalidTransition)?;
            if listing.status == target {
                return Ok(listing);
            }
            let updated = self
                .listings
                .set_status(
                    id,
                    target,
                    &[ListingStatus::Active, ListingStatus::Inactive],
                )
                .await?;
            if let Some(updated) = updated {
                return Ok(updated);
            }
        }
        Err(ListingError::Conflict)
    }

    /// Place a provisional hold against available quantity
    pub async fn reserve(&self, id: &str, amount: Decimal) -> ListingResult<Listing> {
        require_positive_amount(amount)?;
        self.with_ledger_retry(|| self.listings.reserve(id, amount))
            .await
    }

    /// Release a hold (buyer cancelled); clamped at zero
    pub async fn release(&self, id: &str, amount: Decimal) -> ListingResult<Listing> {
        require_positive_amount(amount)?;
        self.with_ledger_retry(|| self.listings.release(id, amount))
            .await
    }

    /// Fulfill an order; flips the listing to `sold_out` at zero
    pub async fn reduce(&self, id: &str, amount: Decimal) -> ListingResult<Listing> {
        require_positive_amount(amount)?;
        self.with_ledger_retry(|| self.listings.reduce(id, amount))
            .await
    }

    /// Interaction counters for the farmer dashboard
    pub async fn get_statistics(&self, id: &str) -> ListingResult<ListingStatistics> {
        Ok(self.load(id).await?.statistics)
    }

    /// Retry a guarded ledger mutation on transient engine conflicts
    async fn with_ledger_retry<T, F, Fut>(&self, op: F) -> ListingResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RepoError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Err(RepoError::Conflict(msg)) if attempt + 1 < MAX_LEDGER_RETRIES => {
                    attempt += 1;
                    tracing::debug!(attempt, error = %msg, "ledger write conflict, retrying");
                    tokio::time::sleep(std::time::Duration::from_millis(10 * attempt as u64))
                        .await;
                }
                other => return other.map_err(ListingError::from),
            }
        }
    }
}

fn require_positive_amount(amount: Decimal) -> ListingResult<()> {
    shared::listing::ledger::require_positive(amount).map_err(ListingError::from)
}

fn map_crop_error(err: RepoError) -> ListingError {
    match err {
        RepoError::NotFound(msg) => ListingError::CropNotFound(msg),
        other => other.into(),
    }
}

fn build_listing(
    crop: &Crop,
    farmer_id: &str,
    data: &ListingCreate,
    now: chrono::DateTime<Utc>,
    validity: chrono::Duration,
) -> ListingResult<Listing> {
    let crop_record = crop
        .id
        .clone()
        .ok_or_else(|| ListingError::Storage("crop record has no id".to_string()))?;
    let farmer = crate::db::repository::parse_record_id("farmer", farmer_id)
        .map_err(|e| ListingError::Validation(e.to_string()))?;

    let mut certifications = data.certifications.clone().unwrap_or_default();
    certifications.sort();
    certifications.dedup();

    let harvest_status = match crop.growth_stage {
        GrowthStage::Harvested => HarvestStatus::Completed,
        _ => HarvestStatus::Ready,
    };

    Ok(Listing {
        id: None,
        crop: crop_record,
        farmer,
        crop_name: crop.name.clone(),
        description: data.description.clone().unwrap_or_default(),
        quantity: Quantity::new(data.quantity, data.unit.unwrap_or(crop.yield_unit)),
        pricing: Pricing {
            price_per_unit: data.price_per_unit,
            currency: data.currency.clone().unwrap_or_else(|| "INR".to_string()),
            negotiable: data.negotiable.unwrap_or(false),
            minimum_order_quantity: data.minimum_order_quantity.unwrap_or(Decimal::ZERO),
        },
        harvest_info: HarvestInfo {
            expected_harvest_date: crop.expected_harvest_date.unwrap_or(now),
            actual_harvest_date: crop.actual_harvest_date,
            harvest_status,
        },
        quality: Quality {
            grade: data.grade.clone().unwrap_or_default(),
            is_organic: data.is_organic.unwrap_or(false),
            certifications,
            health_status: crop.health_status.clone(),
        },
        images: data.images.clone().unwrap_or_default(),
        status: ListingStatus::Active,
        visibility: data.visibility.unwrap_or(Visibility::Public),
        location: crop.location,
        expires_at: Datetime::from(now + validity),
        statistics: ListingStatistics::default(),
        created_at: Datetime::from(now),
        updated_at: Datetime::from(now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use surrealdb::RecordId;

    use crate::db::DbService;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    async fn service() -> (ListingService, Surreal<Db>) {
        let db = DbService::memory().await.expect("in-memory db").db;
        (ListingService::new(db.clone(), None, 30), db)
    }

    async fn seed_crop(
        db: &Surreal<Db>,
        key: &str,
        farmer: &str,
        stage: GrowthStage,
        actual_yield: Option<Decimal>,
    ) {
        let crop = Crop {
            id: None,
            name: "wheat".to_string(),
            farmer: RecordId::from_table_key("farmer", farmer),
            growth_stage: stage,
            actual_yield,
            yield_unit: shared::listing::QuantityUnit::Kg,
            expected_harvest_date: Some(Utc::now()),
            actual_harvest_date: None,
            soil_type: None,
            irrigation_method: None,
            health_status: "healthy".to_string(),
            location: None,
            marketplace_listing: None,
        };
        let _: Option<Crop> = db
            .create(("crop", key))
            .content(crop)
            .await
            .expect("seed crop");
    }

    fn create_terms(crop_key: &str, quantity: Decimal) -> ListingCreate {
        ListingCreate {
            crop_id: format!("crop:{crop_key}"),
            quantity,
            unit: None,
            price_per_unit: d(25),
            currency: None,
            negotiable: None,
            minimum_order_quantity: None,
            description: Some("freshly harvested".to_string()),
            images: None,
            grade: Some("A".to_string()),
            is_organic: Some(true),
            certifications: None,
            visibility: None,
            validity_days: None,
        }
    }

    #[tokio::test]
    async fn create_listing_from_harvested_crop() {
        let (svc, db) = service().await;
        seed_crop(&db, "c1", "f1", GrowthStage::Harvested, Some(d(100))).await;

        let listing = svc
            .create_listing("f1", create_terms("c1", d(80)))
            .await
            .expect("create");

        assert_eq!(listing.status, ListingStatus::Active);
        assert_eq!(listing.crop_name, "wheat");
        assert_eq!(listing.quantity.available, d(80));
        assert_eq!(listing.quantity.reserved, Decimal::ZERO);
        assert_eq!(listing.quality.health_status, "healthy");

        // back-pointer lands on the crop
        let crop: Option<Crop> = db.select(("crop", "c1")).await.expect("crop");
        let back = crop.and_then(|c| c.marketplace_listing).expect("pointer");
        assert_eq!(back.quantity, d(80));
    }

    #[tokio::test]
    async fn create_rejects_unsellable_growth_stage() {
        let (svc, db) = service().await;
        seed_crop(&db, "c1", "f1", GrowthStage::Growing, None).await;

        let err = svc
            .create_listing("f1", create_terms("c1", d(10)))
            .await
            .expect_err("growing crop");
        assert!(matches!(err, ListingError::CropNotReady { .. }));
    }

    #[tokio::test]
    async fn create_rejects_quantity_over_yield() {
        let (svc, db) = service().await;
        seed_crop(&db, "c1", "f1", GrowthStage::Harvested, Some(d(50))).await;

        let err = svc
            .create_listing("f1", create_terms("c1", d(51)))
            .await
            .expect_err("over yield");
        assert!(matches!(err, ListingError::QuantityExceedsYield { .. }));
    }

    #[tokio::test]
    async fn create_hides_foreign_crops() {
        let (svc, db) = service().await;
        seed_crop(&db, "c1", "f1", GrowthStage::Harvested, Some(d(100))).await;

        let err = svc
            .create_listing("f2", create_terms("c1", d(10)))
            .await
            .expect_err("foreign crop");
        assert!(matches!(err, ListingError::CropNotFound(_)));
    }

    #[tokio::test]
    async fn create_rejects_second_active_listing() {
        let (svc, db) = service().await;
        seed_crop(&db, "c1", "f1", GrowthStage::Harvested, Some(d(100))).await;

        svc.create_listing("f1", create_terms("c1", d(40)))
            .await
            .expect("first");
        let err = svc
            .create_listing("f1", create_terms("c1", d(40)))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, ListingError::DuplicateActiveListing));
    }

    #[tokio::test]
    async fn deactivate_is_idempotent_and_reactivate_restores() {
        let (svc, db) = service().await;
        seed_crop(&db, "c1", "f1", GrowthStage::Harvested, Some(d(100))).await;
        let listing = svc
            .create_listing("f1", create_terms("c1", d(40)))
            .await
            .expect("create");
        let id = listing.id.expect("id").to_string();

        let inactive = svc.deactivate(&id).await.expect("deactivate");
        assert_eq!(inactive.status, ListingStatus::Inactive);
        let again = svc.deactivate(&id).await.expect("deactivate again");
        assert_eq!(again.status, ListingStatus::Inactive);

        let active = svc.reactivate(&id).await.expect("reactivate");
        assert_eq!(active.status, ListingStatus::Active);
    }

    #[tokio::test]
    async fn sold_out_blocks_both_transitions() {
        let (svc, db) = service().await;
        seed_crop(&db, "c1", "f1", GrowthStage::Harvested, Some(d(100))).await;
        let listing = svc
            .create_listing("f1", create_terms("c1", d(40)))
            .await
            .expect("create");
        let id = listing.id.expect("id").to_string();

        let sold = svc.reduce(&id, d(40)).await.expect("reduce all");
        assert_eq!(sold.status, ListingStatus::SoldOut);

        let err = svc.reactivate(&id).await.expect_err("reactivate sold out");
        assert!(matches!(
            err,
            ListingError::InvalidTransition(TransitionError::SoldOut)
        ));
        let err = svc.deactivate(&id).await.expect_err("deactivate sold out");
        assert!(matches!(
            err,
            ListingError::InvalidTransition(TransitionError::SoldOut)
        ));
    }

    #[tokio::test]
    async fn reserve_release_round_trip() {
        let (svc, db) = service().await;
        seed_crop(&db, "c1", "f1", GrowthStage::Harvested, Some(d(100))).await;
        let listing = svc
            .create_listing("f1", create_terms("c1", d(100)))
            .await
            .expect("create");
        let id = listing.id.expect("id").to_string();

        let held = svc.reserve(&id, d(60)).await.expect("reserve");
        assert_eq!(held.quantity.reserved, d(60));
        assert_eq!(held.quantity.actual_available(), d(40));

        let err = svc.reserve(&id, d(50)).await.expect_err("over-reserve");
        assert!(matches!(err, ListingError::InsufficientQuantity));

        let freed = svc.release(&id, d(60)).await.expect("release");
        assert_eq!(freed.quantity.reserved, Decimal::ZERO);
        assert_eq!(freed.quantity.available, d(100));

        // release never over-shoots below zero
        let clamped = svc.release(&id, d(10)).await.expect("release again");
        assert_eq!(clamped.quantity.reserved, Decimal::ZERO);
    }

    #[tokio::test]
    async fn update_terms_routes_status_through_state_machine() {
        let (svc, db) = service().await;
        seed_crop(&db, "c1", "f1", GrowthStage::Harvested, Some(d(100))).await;
        let listing = svc
            .create_listing("f1", create_terms("c1", d(40)))
            .await
            .expect("create");
        let id = listing.id.expect("id").to_string();

        let updated = svc
            .update_terms(
                &id,
                ListingUpdate {
                    price_per_unit: Some(d(30)),
                    status: Some(ListingStatus::Inactive),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.pricing.price_per_unit, d(30));
        assert_eq!(updated.status, ListingStatus::Inactive);

        // terminal states cannot be requested directly
        let err = svc
            .update_terms(
                &id,
                ListingUpdate {
                    status: Some(ListingStatus::SoldOut),
                    ..Default::default()
                },
            )
            .await
            .expect_err("direct terminal");
        assert!(matches!(err, ListingError::Validation(_)));
    }

    #[tokio::test]
    async fn record_inquiry_requires_eligibility() {
        let (svc, db) = service().await;
        seed_crop(&db, "c1", "f1", GrowthStage::Harvested, Some(d(100))).await;
        let listing = svc
            .create_listing("f1", create_terms("c1", d(40)))
            .await
            .expect("create");
        let id = listing.id.expect("id").to_string();

        let after = svc.record_inquiry(&id).await.expect("inquiry");
        assert_eq!(after.statistics.inquiries, 1);

        svc.deactivate(&id).await.expect("deactivate");
        let err = svc.record_inquiry(&id).await.expect_err("inactive");
        assert!(matches!(err, ListingError::ListingNotFound(_)));
    }
}
