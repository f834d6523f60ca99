//! Farmer-facing listing API
//!
//! All mutations route through [`crate::listings::ListingService`]; the
//! handlers only translate HTTP payloads and service errors.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/market/listings", listing_routes())
}

fn listing_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/mine/{farmer_id}", get(handler::list_mine))
        .route("/{id}", get(handler::get_by_id).put(handler::update))
        .route("/{id}/deactivate", post(handler::deactivate))
        .route("/{id}/reactivate", post(handler::reactivate))
        .route("/{id}/statistics", get(handler::statistics))
        .route("/{id}/reserve", post(handler::reserve))
        .route("/{id}/release", post(handler::release))
        .route("/{id}/reduce", post(handler::reduce))
}
