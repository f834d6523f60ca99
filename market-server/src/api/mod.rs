//! API route modules
//!
//! # Structure
//!
//! - [`health`] - health check
//! - [`listings`] - farmer-facing listing management
//! - [`catalog`] - buyer-facing discovery

pub mod catalog;
pub mod health;
pub mod listings;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};
