//! Database Module
//!
//! Embedded SurrealDB storage: RocksDB-backed in production, in-memory for
//! tests. Holds the persisted models and the repository layer.

pub mod models;
pub mod repository;

use std::path::Path;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

use crate::core::ServerError;

const NAMESPACE: &str = "agrimarket";
const DATABASE: &str = "market";

/// Database service — owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open the RocksDB-backed database under the given directory
    pub async fn open(dir: &Path) -> Result<Self, ServerError> {
        let db = Surreal::new::<RocksDb>(dir).await?;
        db.use_ns(NAMESPACE).use_db(DATABASE).await?;
        init_schema(&db).await?;
        tracing::info!("Database opened at {}", dir.display());
        Ok(Self { db })
    }

    /// Open an in-memory database (tests)
    pub async fn memory() -> Result<Self, ServerError> {
        let db = Surreal::new::<Mem>(()).await?;
        db.use_ns(NAMESPACE).use_db(DATABASE).await?;
        init_schema(&db).await?;
        Ok(Self { db })
    }
}

/// Define indexes used by the listing queries
///
/// The duplicate-active-listing guard itself is transactional (see
/// `ListingRepository::create_unique`) — the index only speeds up the
/// existence check and the farmer/crop lookups.
async fn init_schema(db: &Surreal<Db>) -> Result<(), surrealdb::Error> {
    db.query(
        "
        DEFINE INDEX IF NOT EXISTS listing_crop_farmer ON TABLE listing COLUMNS crop, farmer;
        DEFINE INDEX IF NOT EXISTS listing_farmer ON TABLE listing COLUMNS farmer;
        DEFINE INDEX IF NOT EXISTS listing_status ON TABLE listing COLUMNS status;
        ",
    )
    .await?
    .check()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_rocksdb_backed_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = DbService::open(dir.path()).await.expect("open");
        service.db.query("RETURN 1").await.expect("query");
    }

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let service = DbService::memory().await.expect("memory");
        init_schema(&service.db).await.expect("second init");
    }
}
