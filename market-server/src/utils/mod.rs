//! Utility module — common helpers and types
//!
//! - [`AppError`] — application error type
//! - [`AppResponse`] — API response envelope
//! - Logging and validation helpers

pub mod error;
pub mod logger;
pub mod validation;

pub use error::{AppError, AppResponse, ok, ok_with_message};

/// Application-level Result type used in HTTP handlers
pub type AppResult<T> = Result<T, AppError>;
