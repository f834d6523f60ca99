//! Crop Repository (collaborator)
//!
//! Read-only access to crop records plus the single denormalized
//! back-pointer write the listing core is allowed to make.

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{Crop, CropId, MarketplaceListingRef};

pub const CROP_TABLE: &str = "crop";

#[derive(Clone)]
pub struct CropRepository {
    base: BaseRepository,
}

impl CropRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub fn record_id(id: &str) -> RepoResult<CropId> {
        parse_record_id(CROP_TABLE, id)
    }

    /// Find crop by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Crop>> {
        let record = Self::record_id(id)?;
        let crop: Option<Crop> = self.base.db().select(record).await?;
        Ok(crop)
    }

    /// Write the marketplace back-pointer after a listing is created
    pub async fn set_marketplace_listing(
        &self,
        id: &str,
        listing_ref: MarketplaceListingRef,
    ) -> RepoResult<Crop> {
        let record = Self::record_id(id)?;
        let mut response = self
            .base
            .db()
            .query("UPDATE $id SET marketplace_listing = $ref RETURN AFTER")
            .bind(("id", record))
            .bind(("ref", listing_ref))
            .await?
            .check()?;
        let crop: Option<Crop> = response.take(0)?;
        crop.ok_or_else(|| RepoError::NotFound(format!("Crop {id}")))
    }
}
