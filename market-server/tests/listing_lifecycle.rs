//! End-to-end listing lifecycle against an in-memory database
//!
//! Covers the full path a real listing takes: creation from a harvested
//! crop, reservation holds, order fulfillment down to sold-out, and the
//! lazy expiration view. The concurrency test drives two racing
//! reservations at the same stock to prove the storage-level guard.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use surrealdb::RecordId;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use surrealdb::sql::Datetime;

use market_server::ListingError;
use market_server::db::DbService;
use market_server::db::models::{Crop, GrowthStage, Listing, ListingCreate, ListingUpdate};
use market_server::db::repository::{ListingFilter, ListingRepository};
use market_server::listings::ListingService;
use shared::listing::{
    HarvestInfo, HarvestStatus, ListingStatistics, ListingStatus, Pricing, Quality, Quantity,
    QuantityUnit, Visibility,
};

fn d(v: i64) -> Decimal {
    Decimal::from(v)
}

async fn setup() -> (ListingService, Surreal<Db>) {
    let db = DbService::memory().await.expect("in-memory db").db;
    (ListingService::new(db.clone(), None, 30), db)
}

async fn seed_crop(db: &Surreal<Db>, key: &str, farmer: &str, actual_yield: Decimal) {
    let crop = Crop {
        id: None,
        name: "tomato".to_string(),
        farmer: RecordId::from_table_key("farmer", farmer),
        growth_stage: GrowthStage::Harvested,
        actual_yield: Some(actual_yield),
        yield_unit: QuantityUnit::Kg,
        expected_harvest_date: Some(Utc::now()),
        actual_harvest_date: Some(Utc::now()),
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

fn terms(crop_key: &str, quantity: Decimal) -> ListingCreate {
    ListingCreate {
        crop_id: format!("crop:{crop_key}"),
        quantity,
        unit: None,
        price_per_unit: d(18),
        currency: None,
        negotiable: Some(true),
        minimum_order_quantity: Some(d(5)),
        description: Some("vine ripened".to_string()),
        images: None,
        grade: Some("A".to_string()),
        is_organic: Some(false),
        certifications: None,
        visibility: None,
        validity_days: None,
    }
}

/// Insert a listing with an arbitrary expiry, bypassing the service clock
async fn seed_listing_with_expiry(
    db: &Surreal<Db>,
    key: &str,
    expires_at: chrono::DateTime<Utc>,
) -> String {
    seed_listing(db, key, expires_at, Visibility::Public).await
}

/// Insert a listing with an arbitrary expiry and visibility
async fn seed_listing(
    db: &Surreal<Db>,
    key: &str,
    expires_at: chrono::DateTime<Utc>,
    visibility: Visibility,
) -> String {
    let now = Utc::now();
    let listing = Listing {
        id: None,
        crop: RecordId::from_table_key("crop", format!("for_{key}")),
        farmer: RecordId::from_table_key("farmer", "f1"),
        crop_name: "onion".to_string(),
        description: String::new(),
        quantity: Quantity::new(d(50), QuantityUnit::Kg),
        pricing: Pricing {
            price_per_unit: d(12),
            currency: "INR".to_string(),
            negotiable: false,
            minimum_order_quantity: Decimal::ZERO,
        },
        harvest_info: HarvestInfo {
            expected_harvest_date: now,
            actual_harvest_date: None,
            harvest_status: HarvestStatus::Completed,
        },
        quality: Quality::default(),
        images: Vec::new(),
        status: ListingStatus::Active,
        visibility,
        location: None,
        expires_at: Datetime::from(expires_at),
        statistics: ListingStatistics::default(),
        created_at: Datetime::from(now),
        updated_at: Datetime::from(now),
    };
    let stored: Option<Listing> = db
        .create(("listing", key))
        .content(listing)
        .await
        .expect("seed listing");
    stored
        .and_then(|l| l.id)
        .map(|id| id.to_string())
        .expect("listing id")
}

#[tokio::test]
async fn full_lifecycle_create_reserve_fulfill_sold_out() {
    let (svc, db) = setup().await;
    seed_crop(&db, "c1", "f1", d(100)).await;

    let listing = svc
        .create_listing("f1", terms("c1", d(100)))
        .await
        .expect("create");
    let id = listing.id.expect("id").to_string();
    assert_eq!(listing.status, ListingStatus::Active);

    // a buyer holds 30
    let held = svc.reserve(&id, d(30)).await.expect("reserve");
    assert_eq!(held.quantity.reserved, d(30));
    assert_eq!(held.quantity.actual_available(), d(70));

    // the held order is fulfilled
    let after_order = svc.reduce(&id, d(30)).await.expect("reduce");
    assert_eq!(after_order.quantity.available, d(70));
    assert_eq!(after_order.quantity.reserved, Decimal::ZERO);
    assert_eq!(after_order.status, ListingStatus::Active);
    assert_eq!(after_order.statistics.orders, 1);

    // a second order takes the rest
    let sold = svc.reduce(&id, d(70)).await.expect("reduce to zero");
    assert_eq!(sold.quantity.available, Decimal::ZERO);
    assert_eq!(sold.status, ListingStatus::SoldOut);

    // sold_out is terminal
    let err = svc.reactivate(&id).await.expect_err("reactivate");
    assert!(matches!(err, ListingError::InvalidTransition(_)));

    // and the catalog no longer serves it
    let repo = ListingRepository::new(db.clone());
    let found = repo
        .search(&ListingFilter::default())
        .await
        .expect("search");
    assert!(found.iter().all(|l| l.id.as_ref().map(|i| i.to_string()) != Some(id.clone())));
}

#[tokio::test]
async fn racing_reservations_never_oversell() {
    let (svc, db) = setup().await;
    seed_crop(&db, "c1", "f1", d(100)).await;
    let listing = svc
        .create_listing("f1", terms("c1", d(100)))
        .await
        .expect("create");
    let id = listing.id.expect("id").to_string();

    // two buyers race for 60 each against 100 available
    let (a, b) = tokio::join!(svc.reserve(&id, d(60)), svc.reserve(&id, d(60)));
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one reservation may win");

    let loser = if a.is_err() { a } else { b };
    assert!(matches!(
        loser.expect_err("loser"),
        ListingError::InsufficientQuantity | ListingError::Conflict
    ));

    // the ledger invariant held
    let repo = ListingRepository::new(db.clone());
    let stored = repo.find_by_id(&id).await.expect("find").expect("stored");
    assert_eq!(stored.quantity.reserved, d(60));
    assert!(stored.quantity.reserved <= stored.quantity.available);
}

#[tokio::test]
async fn expired_listing_is_invisible_before_any_sweep() {
    let (svc, db) = setup().await;
    let expired_id =
        seed_listing_with_expiry(&db, "old", Utc::now() - Duration::days(1)).await;
    let live_id = seed_listing_with_expiry(&db, "live", Utc::now() + Duration::days(7)).await;

    // stored status still says active, the clock says otherwise
    let repo = ListingRepository::new(db.clone());
    let stored = repo
        .find_by_id(&expired_id)
        .await
        .expect("find")
        .expect("stored");
    assert_eq!(stored.status, ListingStatus::Active);
    assert!(stored.is_expired(Utc::now()));

    // discovery never serves it
    let found = repo
        .search(&ListingFilter::default())
        .await
        .expect("search");
    let ids: Vec<String> = found
        .iter()
        .filter_map(|l| l.id.as_ref().map(|i| i.to_string()))
        .collect();
    assert!(ids.contains(&live_id));
    assert!(!ids.contains(&expired_id));

    // inquiries bounce off the eligibility predicate
    let err = svc
        .record_inquiry(&expired_id)
        .await
        .expect_err("expired inquiry");
    assert!(matches!(err, ListingError::ListingNotFound(_)));

    // reactivation reports the expiry, not the stored status
    let err = svc.reactivate(&expired_id).await.expect_err("reactivate");
    assert!(matches!(
        err,
        ListingError::InvalidTransition(shared::listing::TransitionError::Expired)
    ));
}

#[tokio::test]
async fn release_is_clamped_and_never_raises_available() {
    let (svc, db) = setup().await;
    seed_crop(&db, "c1", "f1", d(100)).await;
    let listing = svc
        .create_listing("f1", terms("c1", d(100)))
        .await
        .expect("create");
    let id = listing.id.expect("id").to_string();

    svc.reserve(&id, d(20)).await.expect("reserve");
    let freed = svc.release(&id, d(50)).await.expect("over-release");
    assert_eq!(freed.quantity.reserved, Decimal::ZERO);
    assert_eq!(freed.quantity.available, d(100));
}

#[tokio::test]
async fn fulfillment_larger_than_hold_consumes_free_stock() {
    let (svc, db) = setup().await;
    seed_crop(&db, "c1", "f1", d(100)).await;
    let listing = svc
        .create_listing("f1", terms("c1", d(100)))
        .await
        .expect("create");
    let id = listing.id.expect("id").to_string();

    svc.reserve(&id, d(10)).await.expect("reserve");
    let after = svc.reduce(&id, d(40)).await.expect("reduce");
    assert_eq!(after.quantity.available, d(60));
    assert_eq!(after.quantity.reserved, Decimal::ZERO);

    // but fulfillment can never exceed total available
    let err = svc.reduce(&id, d(61)).await.expect_err("over-reduce");
    assert!(matches!(err, ListingError::InsufficientQuantity));
}

fn ids(listings: &[Listing]) -> Vec<String> {
    listings
        .iter()
        .filter_map(|l| l.id.as_ref().map(|i| i.to_string()))
        .collect()
}

#[tokio::test]
async fn non_public_listings_stay_off_the_discovery_shelf() {
    let (_svc, db) = setup().await;
    let future = Utc::now() + Duration::days(7);
    let public_id = seed_listing(&db, "open", future, Visibility::Public).await;
    let private_id = seed_listing(&db, "hidden", future, Visibility::Private).await;
    seed_listing(&db, "vetted", future, Visibility::VerifiedBuyersOnly).await;

    let repo = ListingRepository::new(db.clone());

    // an unfiltered search serves the public shelf only
    let found = ids(&repo.search(&ListingFilter::default()).await.expect("search"));
    assert_eq!(found, vec![public_id.clone()]);

    // widening is an explicit request, never the default
    let widened = ids(
        &repo
            .search(&ListingFilter {
                visibility: Some(Visibility::Private),
                ..Default::default()
            })
            .await
            .expect("widened search"),
    );
    assert_eq!(widened, vec![private_id]);

    // the featured shelf applies the same scope
    let featured = ids(&repo.find_featured(10).await.expect("featured"));
    assert_eq!(featured, vec![public_id]);
}

#[tokio::test]
async fn catalog_pages_are_clamped_against_overflow() {
    let (_svc, db) = setup().await;
    for key in ["p1", "p2", "p3"] {
        seed_listing_with_expiry(&db, key, Utc::now() + Duration::days(7)).await;
    }
    let repo = ListingRepository::new(db.clone());
    let page = |n: usize| ListingFilter {
        page: Some(n),
        limit: Some(2),
        ..Default::default()
    };

    let first = ids(&repo.search(&page(1)).await.expect("page 1"));
    let second = ids(&repo.search(&page(2)).await.expect("page 2"));
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 1);
    assert!(!first.contains(&second[0]));

    // an absurd page number is an empty page, not an overflow
    let far = repo.search(&page(usize::MAX)).await.expect("far page");
    assert!(far.is_empty());
}

#[tokio::test]
async fn blocked_status_change_leaves_terms_untouched() {
    let (svc, db) = setup().await;
    let id = seed_listing_with_expiry(&db, "stale", Utc::now() - Duration::days(1)).await;

    let err = svc
        .update_terms(
            &id,
            ListingUpdate {
                price_per_unit: Some(d(99)),
                status: Some(ListingStatus::Active),
                ..Default::default()
            },
        )
        .await
        .expect_err("reactivate past expiry");
    assert!(matches!(err, ListingError::InvalidTransition(_)));

    // the price change rode along with the refused transition, so
    // nothing may have landed
    let repo = ListingRepository::new(db.clone());
    let stored = repo.find_by_id(&id).await.expect("find").expect("stored");
    assert_eq!(stored.pricing.price_per_unit, d(12));
}
