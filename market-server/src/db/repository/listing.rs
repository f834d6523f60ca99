//! Listing Repository
//!
//! All ledger mutations run as guarded statements inside explicit
//! transactions: the invariant (`reserved + amount <= available`,
//! `amount <= available`) is re-checked by the storage engine at write
//! time, never against a stale in-process read. Guard failures are
//! THROW'n and classified back into [`RepoError`] variants.

use rust_decimal::Decimal;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use shared::listing::ListingStatus;

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{CatalogStats, Listing, ListingId, ListingUpdate};

pub const LISTING_TABLE: &str = "listing";

/// Deepest page the catalog will serve; keeps the offset arithmetic
/// well clear of overflow
pub const MAX_PAGE: usize = 100_000;

// THROW markers used inside transactions (matched lowercase in From<surrealdb::Error>)
pub(crate) const THROW_NOT_FOUND: &str = "listing_not_found";
pub(crate) const THROW_DUPLICATE: &str = "duplicate_active_listing";
pub(crate) const THROW_INSUFFICIENT: &str = "insufficient_quantity";

/// Sort order for catalog queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    ExpiringSoon,
}

/// Catalog discovery filter — purely derived, carries no invariants
///
/// Eligibility (`status = active` AND `expires_at > now`) is always applied
/// on top of whatever the caller asks for.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ListingFilter {
    /// Free-text match over crop name and description
    pub q: Option<String>,
    pub crop_name: Option<String>,
    pub organic: Option<bool>,
    pub grade: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Minimum actual available quantity (available − reserved)
    pub min_quantity: Option<Decimal>,
    /// Defaults to `public`; wider scopes must be requested explicitly
    pub visibility: Option<shared::listing::Visibility>,
    /// Geo radius filter; all three must be present to take effect
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub sort: SortBy,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

// =============================================================================
// Listing Repository
// =============================================================================

#[derive(Clone)]
pub struct ListingRepository {
    base: BaseRepository,
}

impl ListingRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub fn record_id(id: &str) -> RepoResult<ListingId> {
        parse_record_id(LISTING_TABLE, id)
    }

    /// Find listing by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Listing>> {
        let record = Self::record_id(id)?;
        let listing: Option<Listing> = self.base.db().select(record).await?;
        Ok(listing)
    }

    /// All listings of one farmer, newest first
    pub async fn find_by_farmer(&self, farmer_id: &str) -> RepoResult<Vec<Listing>> {
        // crop/farmer are persisted in their "table:id" string form
        let farmer = parse_record_id("farmer", farmer_id)?.to_string();
        let listings: Vec<Listing> = self
            .base
            .db()
            .query("SELECT * FROM listing WHERE farmer = $farmer ORDER BY created_at DESC")
            .bind(("farmer", farmer))
            .await?
            .take(0)?;
        Ok(listings)
    }

    /// Create a listing, rejecting a second `active` listing for the same
    /// `(crop, farmer)` pair in the same transaction as the create
    pub async fn create_unique(&self, listing: Listing) -> RepoResult<Listing> {
        let crop = listing.crop.to_string();
        let farmer = listing.farmer.to_string();
        let mut response = self
            .base
            .db()
            .query(
                "
                BEGIN TRANSACTION;
                LET $dup = SELECT id FROM listing
                    WHERE crop = $crop AND farmer = $farmer AND status = 'active';
                IF array::len($dup) > 0 { THROW 'duplicate_active_listing' };
                RETURN CREATE ONLY listing CONTENT $data;
                COMMIT TRANSACTION;
                ",
            )
            .bind(("crop", crop))
            .bind(("farmer", farmer))
            .bind(("data", listing))
            .await?
            .check()?;
        let created: Option<Listing> = response.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to create listing".to_string()))
    }

    /// Place a provisional hold: `reserved += amount`, guarded by
    /// `reserved + amount <= available` at write time
    pub async fn reserve(&self, id: &str, amount: Decimal) -> RepoResult<Listing> {
        let record = Self::record_id(id)?;
        let mut response = self
            .base
            .db()
            .query(
                "
                BEGIN TRANSACTION;
                LET $listing = SELECT * FROM ONLY $id;
                IF $listing == NONE { THROW 'listing_not_found' };
                LET $after = UPDATE $id SET
                        quantity.reserved = <decimal>quantity.reserved + <decimal>$amount,
                        updated_at = time::now()
                    WHERE <decimal>quantity.reserved + <decimal>$amount <= <decimal>quantity.available
                    RETURN AFTER;
                IF array::len($after) == 0 { THROW 'insufficient_quantity' };
                RETURN $after[0];
                COMMIT TRANSACTION;
                ",
            )
            .bind(("id", record))
            .bind(("amount", amount))
            .await?
            .check()?;
        let updated: Option<Listing> = response.take(0)?;
        updated.ok_or_else(|| RepoError::Database("reserve returned no row".to_string()))
    }

    /// Release a hold, clamped at zero; never raises `available`
    pub async fn release(&self, id: &str, amount: Decimal) -> RepoResult<Listing> {
        let record = Self::record_id(id)?;
        let mut response = self
            .base
            .db()
            .query(
                "
                UPDATE $id SET
                    quantity.reserved = math::max([<decimal>quantity.reserved - <decimal>$amount, 0dec]),
                    updated_at = time::now()
                RETURN AFTER;
                ",
            )
            .bind(("id", record))
            .bind(("amount", amount))
            .await?
            .check()?;
        let updated: Option<Listing> = response.take(0)?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Listing {id}")))
    }

    /// Fulfillment: `available -= amount`, `reserved -= min(reserved, amount)`,
    /// `statistics.orders += 1`; flips status to `sold_out` in the same
    /// transaction when `available` reaches zero
    pub async fn reduce(&self, id: &str, amount: Decimal) -> RepoResult<Listing> {
        let record = Self::record_id(id)?;
        let mut response = self
            .base
            .db()
            .query(
                "
                BEGIN TRANSACTION;
                LET $listing = SELECT * FROM ONLY $id;
                IF $listing == NONE { THROW 'listing_not_found' };
                LET $after = UPDATE $id SET
                        quantity.available = <decimal>quantity.available - <decimal>$amount,
                        quantity.reserved = math::max([<decimal>quantity.reserved - <decimal>$amount, 0dec]),
                        statistics.orders += 1,
                        updated_at = time::now()
                    WHERE <decimal>$amount <= <decimal>quantity.available
                    RETURN AFTER;
                IF array::len($after) == 0 { THROW 'insufficient_quantity' };
                IF <decimal>$after[0].quantity.available <= 0dec {
                    UPDATE $id SET status = 'sold_out', updated_at = time::now()
                        WHERE status IN ['active', 'inactive'];
                };
                RETURN SELECT * FROM ONLY $id;
                COMMIT TRANSACTION;
                ",
            )
            .bind(("id", record))
            .bind(("amount", amount))
            .await?
            .check()?;
        let updated: Option<Listing> = response.take(0)?;
        updated.ok_or_else(|| RepoError::Database("reduce returned no row".to_string()))
    }

    /// Eligibility-guarded inquiry counter bump
    ///
    /// The guard lives in the statement: a listing that is inactive, sold
    /// out or past its clock is not mutated and `None` is returned.
    pub async fn record_inquiry(&self, id: &str) -> RepoResult<Option<Listing>> {
        let record = Self::record_id(id)?;
        let mut response = self
            .base
            .db()
            .query(
                "
                UPDATE $id SET statistics.inquiries += 1, updated_at = time::now()
                    WHERE status = 'active' AND expires_at > time::now()
                RETURN AFTER;
                ",
            )
            .bind(("id", record))
            .await?
            .check()?;
        let updated: Option<Listing> = response.take(0)?;
        Ok(updated)
    }

    /// Most-viewed eligible listings, for the featured shelf
    pub async fn find_featured(&self, limit: usize) -> RepoResult<Vec<Listing>> {
        let mut response = self
            .base
            .db()
            .query(
                "
                SELECT * FROM listing
                    WHERE status = 'active' AND expires_at > time::now()
                        AND visibility = 'public'
                    ORDER BY statistics.views DESC
                    LIMIT $limit;
                ",
            )
            .bind(("limit", limit.min(100)))
            .await?
            .check()?;
        let listings: Vec<Listing> = response.take(0)?;
        Ok(listings)
    }

    /// View counter bump (discovery get-by-id)
    pub async fn increment_views(&self, id: &str) -> RepoResult<Option<Listing>> {
        let record = Self::record_id(id)?;
        let mut response = self
            .base
            .db()
            .query("UPDATE $id SET statistics.views += 1, updated_at = time::now() RETURN AFTER")
            .bind(("id", record))
            .await?
            .check()?;
        let updated: Option<Listing> = response.take(0)?;
        Ok(updated)
    }

    /// Compare-and-set status transition
    ///
    /// Writes `status` only when the stored status is still one of
    /// `allowed_from` — a concurrent transition to a terminal state can
    /// never be overwritten.
    pub async fn set_status(
        &self,
        id: &str,
        status: ListingStatus,
        allowed_from: &[ListingStatus],
    ) -> RepoResult<Option<Listing>> {
        let record = Self::record_id(id)?;
        let mut response = self
            .base
            .db()
            .query(
                "
                UPDATE $id SET status = $status, updated_at = time::now()
                    WHERE status IN $allowed
                RETURN AFTER;
                ",
            )
            .bind(("id", record))
            .bind(("status", status))
            .bind(("allowed", allowed_from.to_vec()))
            .await?
            .check()?;
        let updated: Option<Listing> = response.take(0)?;
        Ok(updated)
    }

    /// Allow-listed terms update
    ///
    /// Builds a dynamic SET clause from the present fields. Raising
    /// `available` below the current `reserved` would break the ledger
    /// invariant, so that write carries its own guard.
    pub async fn update(&self, id: &str, data: ListingUpdate) -> RepoResult<Listing> {
        let record = Self::record_id(id)?;

        let mut set_parts: Vec<&str> = Vec::new();
        if data.available.is_some() {
            set_parts.push("quantity.available = <decimal>$available");
        }
        if data.price_per_unit.is_some() {
            set_parts.push("pricing.price_per_unit = <decimal>$price_per_unit");
        }
        if data.currency.is_some() {
            set_parts.push("pricing.currency = $currency");
        }
        if data.negotiable.is_some() {
            set_parts.push("pricing.negotiable = $negotiable");
        }
        if data.minimum_order_quantity.is_some() {
            set_parts.push("pricing.minimum_order_quantity = <decimal>$minimum_order_quantity");
        }
        if data.description.is_some() {
            set_parts.push("description = $description");
        }
        if data.images.is_some() {
            set_parts.push("images = $images");
        }
        if data.grade.is_some() {
            set_parts.push("quality.grade = $grade");
        }
        if data.is_organic.is_some() {
            set_parts.push("quality.is_organic = $is_organic");
        }
        if data.certifications.is_some() {
            set_parts.push("quality.certifications = $certifications");
        }
        if data.visibility.is_some() {
            set_parts.push("visibility = $visibility");
        }

        if set_parts.is_empty() {
            return self
                .find_by_id(id)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("Listing {id}")));
        }

        // Guard only matters when available shrinks
        let guard = if data.available.is_some() {
            " WHERE <decimal>quantity.reserved <= <decimal>$available"
        } else {
            ""
        };
        let query_str = format!(
            "UPDATE $id SET {}, updated_at = time::now(){} RETURN AFTER",
            set_parts.join(", "),
            guard
        );

        let mut query = self.base.db().query(&query_str).bind(("id", record));
        if let Some(v) = data.available {
            query = query.bind(("available", v));
        }
        if let Some(v) = data.price_per_unit {
            query = query.bind(("price_per_unit", v));
        }
        if let Some(v) = data.currency {
            query = query.bind(("currency", v));
        }
        if let Some(v) = data.negotiable {
            query = query.bind(("negotiable", v));
        }
        if let Some(v) = data.minimum_order_quantity {
            query = query.bind(("minimum_order_quantity", v));
        }
        if let Some(v) = data.description {
            query = query.bind(("description", v));
        }
        if let Some(v) = data.images {
            query = query.bind(("images", v));
        }
        if let Some(v) = data.grade {
            query = query.bind(("grade", v));
        }
        if let Some(v) = data.is_organic {
            query = query.bind(("is_organic", v));
        }
        if let Some(v) = data.certifications {
            query = query.bind(("certifications", v));
        }
        if let Some(v) = data.visibility {
            query = query.bind(("visibility", v));
        }

        let was_available_update = !guard.is_empty();
        let mut response = query.await?.check()?;
        let listings: Vec<Listing> = response.take(0)?;
        match listings.into_iter().next() {
            Some(l) => Ok(l),
            None => {
                // Either the listing is gone or the available guard failed
                if was_available_update && self.find_by_id(id).await?.is_some() {
                    Err(RepoError::Validation(
                        "available cannot drop below the reserved quantity".into(),
                    ))
                } else {
                    Err(RepoError::NotFound(format!("Listing {id}")))
                }
            }
        }
    }

    /// Catalog search — eligibility plus the caller's filters
    pub async fn search(&self, filter: &ListingFilter) -> RepoResult<Vec<Listing>> {
        let mut where_parts: Vec<String> =
            vec!["status = 'active'".into(), "expires_at > time::now()".into()];

        if filter.q.is_some() {
            where_parts.push(
                "(string::lowercase(crop_name) CONTAINS string::lowercase($q) \
                 OR string::lowercase(description) CONTAINS string::lowercase($q))"
                    .into(),
            );
        }
        if filter.crop_name.is_some() {
            where_parts.push("string::lowercase(crop_name) = string::lowercase($crop_name)".into());
        }
        if filter.organic.is_some() {
            where_parts.push("quality.is_organic = $organic".into());
        }
        if filter.grade.is_some() {
            where_parts.push("quality.grade = $grade".into());
        }
        if filter.min_price.is_some() {
            where_parts.push("<decimal>pricing.price_per_unit >= <decimal>$min_price".into());
        }
        if filter.max_price.is_some() {
            where_parts.push("<decimal>pricing.price_per_unit <= <decimal>$max_price".into());
        }
        if filter.min_quantity.is_some() {
            where_parts.push(
                "<decimal>quantity.available - <decimal>quantity.reserved >= <decimal>$min_quantity"
                    .into(),
            );
        }
        // Discovery serves the public shelf unless a wider scope is asked
        // for explicitly (gating that request is the auth layer's job)
        where_parts.push("visibility = $visibility".into());
        let bbox = geo_bounding_box(filter);
        if bbox.is_some() {
            where_parts.push(
                "location != NONE AND location.lat >= $min_lat AND location.lat <= $max_lat \
                 AND location.lng >= $min_lng AND location.lng <= $max_lng"
                    .into(),
            );
        }

        let order = match filter.sort {
            SortBy::Newest => "created_at DESC",
            SortBy::PriceAsc => "pricing.price_per_unit ASC",
            SortBy::PriceDesc => "pricing.price_per_unit DESC",
            SortBy::ExpiringSoon => "expires_at ASC",
        };

        let limit = filter.limit.unwrap_or(20).min(100);
        // page comes straight off the query string; clamp it before the
        // offset multiply so an absurd value cannot overflow
        let page = filter.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let start = (page - 1) * limit;

        let query_str = format!(
            "SELECT * FROM listing WHERE {} ORDER BY {} LIMIT $limit START $start",
            where_parts.join(" AND "),
            order
        );

        let mut query = self
            .base
            .db()
            .query(&query_str)
            .bind(("limit", limit as i64))
            .bind(("start", start as i64));
        if let Some(v) = filter.q.clone() {
            query = query.bind(("q", v));
        }
        if let Some(v) = filter.crop_name.clone() {
            query = query.bind(("crop_name", v));
        }
        if let Some(v) = filter.organic {
            query = query.bind(("organic", v));
        }
        if let Some(v) = filter.grade.clone() {
            query = query.bind(("grade", v));
        }
        if let Some(v) = filter.min_price {
            query = query.bind(("min_price", v));
        }
        if let Some(v) = filter.max_price {
            query = query.bind(("max_price", v));
        }
        if let Some(v) = filter.min_quantity {
            query = query.bind(("min_quantity", v));
        }
        query = query.bind(("visibility", filter.visibility.unwrap_or_default()));
        if let Some(b) = bbox {
            query = query
                .bind(("min_lat", b.min_lat))
                .bind(("max_lat", b.max_lat))
                .bind(("min_lng", b.min_lng))
                .bind(("max_lng", b.max_lng));
        }

        let mut response = query.await?.check()?;
        let listings: Vec<Listing> = response.take(0)?;
        Ok(listings)
    }

    /// Aggregate counters for the discovery statistics endpoint
    pub async fn catalog_stats(&self) -> RepoResult<CatalogStats> {
        let mut response = self
            .base
            .db()
            .query(
                "
                SELECT
                    count() AS total_listings,
                    math::sum(<int>(status = 'active' AND expires_at > time::now())) AS active_listings,
                    math::sum(<int>(quality.is_organic = true)) AS organic_listings,
                    math::sum(statistics.views) AS total_views,
                    math::sum(statistics.inquiries) AS total_inquiries,
                    math::sum(statistics.orders) AS total_orders
                FROM listing GROUP ALL;
                ",
            )
            .await?
            .check()?;
        let stats: Option<CatalogStats> = response.take(0)?;
        Ok(stats.unwrap_or_default())
    }
}

struct BoundingBox {
    min_lat: f64,
    max_lat: f64,
    min_lng: f64,
    max_lng: f64,
}

/// Approximate bounding box for a radius filter; good enough for
/// "farms near me" discovery, not for survey geometry
fn geo_bounding_box(filter: &ListingFilter) -> Option<BoundingBox> {
    let (lat, lng, radius_km) = (filter.lat?, filter.lng?, filter.radius_km?);
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) || radius_km <= 0.0 {
        return None;
    }
    let lat_delta = radius_km / 111.0;
    let lng_delta = radius_km / (111.0 * lat.to_radians().cos().abs().max(1e-6));
    Some(BoundingBox {
        min_lat: lat - lat_delta,
        max_lat: lat + lat_delta,
        min_lng: lng - lng_delta,
        max_lng: lng + lng_delta,
    })
}
