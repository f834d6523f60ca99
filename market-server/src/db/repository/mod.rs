//! Repository Module
//!
//! SurrealDB persistence for the listing core. Every ledger mutation is a
//! single guarded statement (or an explicit transaction), so the invariant
//! check and the write land atomically at the storage boundary — two racing
//! reservations can never both pass a stale check.

pub mod crop;
pub mod listing;

pub use crop::CropRepository;
pub use listing::{ListingFilter, ListingRepository, SortBy};

use surrealdb::{RecordId, Surreal};
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Insufficient quantity: {0}")]
    InsufficientQuantity(String),

    /// Storage-engine transaction conflict — transient, retryable
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

// Guard failures inside transactions surface as THROW'n strings; engine
// write-write races surface as retryable transaction errors. Both arrive
// here as surrealdb::Error and are classified by message.
impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        let msg = err.to_string();
        let lowered = msg.to_lowercase();
        if lowered.contains(listing::THROW_NOT_FOUND) {
            RepoError::NotFound("listing".into())
        } else if lowered.contains(listing::THROW_DUPLICATE) {
            RepoError::Duplicate("active listing for this crop and farmer".into())
        } else if lowered.contains(listing::THROW_INSUFFICIENT) {
            RepoError::InsufficientQuantity(msg)
        } else if lowered.contains("conflict") || lowered.contains("retry") {
            RepoError::Conflict(msg)
        } else {
            RepoError::Database(msg)
        }
    }
}

impl From<RepoError> for crate::utils::AppError {
    fn from(err: RepoError) -> Self {
        use crate::utils::AppError;
        match err {
            RepoError::NotFound(msg) => AppError::not_found(msg),
            RepoError::Duplicate(msg) => AppError::conflict(msg),
            RepoError::InsufficientQuantity(msg) => AppError::business_rule(msg),
            RepoError::Conflict(msg) => AppError::conflict(msg),
            RepoError::Database(msg) => AppError::database(msg),
            RepoError::Validation(msg) => AppError::validation(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}

/// Parse an id in either "table:key" or bare "key" form into a RecordId
///
/// A "table:key" id naming a different table is rejected.
pub fn parse_record_id(table: &str, id: &str) -> RepoResult<RecordId> {
    if id.contains(':') {
        let record: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("invalid id: {id}")))?;
        if record.table() != table {
            return Err(RepoError::Validation(format!(
                "id {id} does not belong to table {table}"
            )));
        }
        Ok(record)
    } else {
        Ok(RecordId::from_table_key(table, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_record_id_accepts_both_forms() {
        let a = parse_record_id("listing", "abc123").unwrap();
        assert_eq!(a.table(), "listing");

        let b = parse_record_id("listing", "listing:abc123").unwrap();
        assert_eq!(b.table(), "listing");

        assert!(parse_record_id("listing", "crop:abc123").is_err());
    }
}
