//! Catalog API handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Deserialize;
use shared::listing::Visibility;

use crate::core::ServerState;
use crate::db::models::{CatalogStats, Listing};
use crate::db::repository::{ListingFilter, ListingRepository};
use crate::utils::{AppError, AppResult};

const FEATURED_LIMIT: usize = 10;

/// GET /api/market/catalog - filtered discovery search
pub async fn search(
    State(state): State<ServerState>,
    Query(filter): Query<ListingFilter>,
) -> AppResult<Json<Vec<Listing>>> {
    let repo = ListingRepository::new(state.db.clone());
    let listings = repo.search(&filter).await.map_err(AppError::from)?;
    Ok(Json(listings))
}

/// GET /api/market/catalog/featured - most viewed eligible listings
pub async fn featured(State(state): State<ServerState>) -> AppResult<Json<Vec<Listing>>> {
    let repo = ListingRepository::new(state.db.clone());
    let listings = repo
        .find_featured(FEATURED_LIMIT)
        .await
        .map_err(AppError::from)?;
    Ok(Json(listings))
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    /// Search radius in kilometers, default 50
    pub radius_km: Option<f64>,
}

/// GET /api/market/catalog/nearby - listings around a point
pub async fn nearby(
    State(state): State<ServerState>,
    Query(query): Query<NearbyQuery>,
) -> AppResult<Json<Vec<Listing>>> {
    let filter = ListingFilter {
        lat: Some(query.lat),
        lng: Some(query.lng),
        radius_km: Some(query.radius_km.unwrap_or(50.0)),
        ..Default::default()
    };
    let repo = ListingRepository::new(state.db.clone());
    let listings = repo.search(&filter).await.map_err(AppError::from)?;
    Ok(Json(listings))
}

/// GET /api/market/catalog/organic - organic-only shelf
pub async fn organic(
    State(state): State<ServerState>,
    Query(mut filter): Query<ListingFilter>,
) -> AppResult<Json<Vec<Listing>>> {
    filter.organic = Some(true);
    let repo = ListingRepository::new(state.db.clone());
    let listings = repo.search(&filter).await.map_err(AppError::from)?;
    Ok(Json(listings))
}

/// GET /api/market/catalog/by-crop/:crop_name
pub async fn by_crop_name(
    State(state): State<ServerState>,
    Path(crop_name): Path<String>,
    Query(mut filter): Query<ListingFilter>,
) -> AppResult<Json<Vec<Listing>>> {
    filter.crop_name = Some(crop_name);
    let repo = ListingRepository::new(state.db.clone());
    let listings = repo.search(&filter).await.map_err(AppError::from)?;
    Ok(Json(listings))
}

/// GET /api/market/catalog/stats - aggregate catalog numbers
pub async fn stats(State(state): State<ServerState>) -> AppResult<Json<CatalogStats>> {
    let repo = ListingRepository::new(state.db.clone());
    let stats = repo.catalog_stats().await.map_err(AppError::from)?;
    Ok(Json(stats))
}

/// GET /api/market/catalog/:id - listing detail, bumps the view counter
///
/// Ineligible listings (inactive, sold out, or past their clock regardless
/// of stored status) and non-public listings are not served here.
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Listing>> {
    let repo = ListingRepository::new(state.db.clone());
    let listing = repo
        .find_by_id(&id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::not_found(format!("Listing {id}")))?;
    if !listing.is_eligible(Utc::now()) || listing.visibility != Visibility::Public {
        return Err(AppError::not_found(format!("Listing {id}")));
    }
    let viewed = repo
        .increment_views(&id)
        .await
        .map_err(AppError::from)?
        .unwrap_or(listing);
    Ok(Json(viewed))
}

/// POST /api/market/catalog/:id/inquiry - record a buyer inquiry
pub async fn inquiry(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Listing>> {
    let listing = state.listings.record_inquiry(&id).await?;
    Ok(Json(listing))
}
