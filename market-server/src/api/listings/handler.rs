//! Farmer listing API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use shared::listing::ListingStatistics;

use crate::core::ServerState;
use crate::db::models::{Listing, ListingCreate, ListingUpdate};
use crate::db::repository::ListingRepository;
use crate::utils::validation::{
    MAX_CERTIFICATIONS, MAX_DESCRIPTION_LEN, MAX_IMAGES, MAX_SHORT_TEXT_LEN, MAX_URL_LEN,
    validate_optional_text, validate_text_list,
};
use crate::utils::{AppError, AppResult};

/// Payload for POST /api/market/listings
///
/// `farmer_id` travels in the body; an auth layer in front of this service
/// is expected to verify it.
#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    pub farmer_id: String,
    #[serde(flatten)]
    pub listing: ListingCreate,
}

/// Payload for the ledger endpoints (reserve / release / reduce)
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
}

fn validate_create_text(data: &ListingCreate) -> AppResult<()> {
    validate_optional_text(&data.description, "description", MAX_DESCRIPTION_LEN)?;
    validate_optional_text(&data.grade, "grade", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&data.currency, "currency", MAX_SHORT_TEXT_LEN)?;
    if let Some(images) = &data.images {
        validate_text_list(images, "images", MAX_IMAGES, MAX_URL_LEN)?;
    }
    if let Some(certs) = &data.certifications {
        validate_text_list(certs, "certifications", MAX_CERTIFICATIONS, MAX_SHORT_TEXT_LEN)?;
    }
    Ok(())
}

/// POST /api/market/listings - create a listing from a crop
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateListingRequest>,
) -> AppResult<Json<Listing>> {
    validate_create_text(&payload.listing)?;
    let listing = state
        .listings
        .create_listing(&payload.farmer_id, payload.listing)
        .await?;
    Ok(Json(listing))
}

/// GET /api/market/listings/mine/:farmer_id - the farmer's own listings
///
/// Returns every status, stored status included — the farmer sees their
/// full history, not the eligibility view.
pub async fn list_mine(
    State(state): State<ServerState>,
    Path(farmer_id): Path<String>,
) -> AppResult<Json<Vec<Listing>>> {
    let repo = ListingRepository::new(state.db.clone());
    let listings = repo.find_by_farmer(&farmer_id).await.map_err(AppError::from)?;
    Ok(Json(listings))
}

/// GET /api/market/listings/:id - single listing, no view bump
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
    Ok(Json(listing))
}

/// PUT /api/market/listings/:id - allow-listed terms update
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<ListingUpdate>,
) -> AppResult<Json<Listing>> {
    validate_optional_text(&payload.description, "description", MAX_DESCRIPTION_LEN)?;
    if let Some(images) = &payload.images {
        validate_text_list(images, "images", MAX_IMAGES, MAX_URL_LEN)?;
    }
    let listing = state.listings.update_terms(&id, payload).await?;
    Ok(Json(listing))
}

/// POST /api/market/listings/:id/deactivate
pub async fn deactivate(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Listing>> {
    let listing = state.listings.deactivate(&id).await?;
    Ok(Json(listing))
}

/// POST /api/market/listings/:id/reactivate
pub async fn reactivate(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Listing>> {
    let listing = state.listings.reactivate(&id).await?;
    Ok(Json(listing))
}

/// GET /api/market/listings/:id/statistics - interaction counters
pub async fn statistics(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ListingStatistics>> {
    let stats = state.listings.get_statistics(&id).await?;
    Ok(Json(stats))
}

/// POST /api/market/listings/:id/reserve - hold quantity for a buyer
pub async fn reserve(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<AmountRequest>,
) -> AppResult<Json<Listing>> {
    let listing = state.listings.reserve(&id, payload.amount).await?;
    Ok(Json(listing))
}

/// POST /api/market/listings/:id/release - release a hold
pub async fn release(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<AmountRequest>,
) -> AppResult<Json<Listing>> {
    let listing = state.listings.release(&id, payload.amount).await?;
    Ok(Json(listing))
}

/// POST /api/market/listings/:id/reduce - fulfill an order
pub async fn reduce(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<AmountRequest>,
) -> AppResult<Json<Listing>> {
    let listing = state.listings.reduce(&id, payload.amount).await?;
    Ok(Json(listing))
}
