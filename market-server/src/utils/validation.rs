//! Input validation helpers
//!
//! Centralized text length constants and validation functions used by the
//! create/update handlers.

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: crop names, grade labels, certification names
pub const MAX_NAME_LEN: usize = 200;

/// Listing descriptions
pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// Short identifiers: currency codes, units, status strings
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Image URLs / paths
pub const MAX_URL_LEN: usize = 2048;

/// Maximum number of images per listing
pub const MAX_IMAGES: usize = 10;

/// Maximum number of certifications per listing
pub const MAX_CERTIFICATIONS: usize = 20;

// ── Validation helpers (CRUD handlers) ──────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

/// Validate that a string list stays within count and per-item length limits.
pub fn validate_text_list(
    values: &[String],
    field: &str,
    max_items: usize,
    max_len: usize,
) -> Result<(), AppError> {
    if values.len() > max_items {
        return Err(AppError::validation(format!(
            "{field} has too many entries ({}, max {max_items})",
            values.len()
        )));
    }
    for v in values {
        validate_required_text(v, field, max_len)?;
    }
    Ok(())
}
