//! Buyer-facing catalog API
//!
//! Read-side discovery over eligible listings. Every route applies the
//! eligibility predicate (active status AND unexpired clock), so a stale
//! stored status is never served as live inventory.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/market/catalog", catalog_routes())
}

fn catalog_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::search))
        .route("/featured", get(handler::featured))
        .route("/nearby", get(handler::nearby))
        .route("/organic", get(handler::organic))
        .route("/by-crop/{crop_name}", get(handler::by_crop_name))
        .route("/stats", get(handler::stats))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/inquiry", post(handler::inquiry))
}
