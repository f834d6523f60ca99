use thiserror::Error;

/// Startup and runtime failures of the server itself
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] surrealdb::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for server startup and shutdown paths
pub type Result<T> = std::result::Result<T, ServerError>;
