use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::core::Config;
use crate::db::DbService;
use crate::listings::ListingService;
use crate::services::MarketplacePublisher;

/// Server state — shared handles to every service
///
/// Cloning is shallow; all members are cheap reference handles.
///
/// | Field | Type | Description |
/// |-------|------|-------------|
/// | config | Config | Immutable configuration |
/// | db | Surreal<Db> | Embedded database |
/// | listings | ListingService | Listing lifecycle service |
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Config,
    /// Embedded database (SurrealDB)
    pub db: Surreal<Db>,
    /// Listing lifecycle service — the only writer of the quantity ledger
    pub listings: ListingService,
}

impl ServerState {
    /// Initialize server state
    ///
    /// 1. Ensure the working directory structure exists
    /// 2. Open the embedded database under `work_dir/database`
    /// 3. Wire up the lifecycle service and the optional publish client
    pub async fn initialize(config: &Config) -> crate::core::Result<Self> {
        config.ensure_work_dir_structure()?;

        let db_service = DbService::open(&config.database_dir()).await?;
        let db = db_service.db;

        let publisher = match config.marketplace_service_url.as_ref() {
            Some(url) => match MarketplacePublisher::new(url.clone()) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to build publish client, publish disabled");
                    None
                }
            },
            None => {
                tracing::info!("MARKETPLACE_SERVICE_URL not set, cross-service publish disabled");
                None
            }
        };

        let listings = ListingService::new(db.clone(), publisher, config.default_validity_days);

        Ok(Self {
            config: config.clone(),
            db,
            listings,
        })
    }

    /// In-memory state for tests
    #[cfg(test)]
    pub async fn for_tests() -> Self {
        let db_service = DbService::memory().await.expect("in-memory db");
        let db = db_service.db;
        let config = Config::from_env();
        let listings = ListingService::new(db.clone(), None, config.default_validity_days);
        Self {
            config,
            db,
            listings,
        }
    }
}
