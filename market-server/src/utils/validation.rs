//! Input validation helpers
//!
//! Centralized length limits and range checks for request bodies.
//! Lengths are counted in characters, not bytes.

use shared::error::{AppError, ErrorCode};

// ── Text length limits ──────────────────────────────────────────────

/// Contact names
pub const MAX_NAME_LEN: usize = 200;

/// Phone numbers
pub const MAX_PHONE_LEN: usize = 32;

/// Delivery addresses
pub const MAX_ADDRESS_LEN: usize = 500;

/// Order notes, cancellation reasons
pub const MAX_NOTE_LEN: usize = 500;

/// Rating review text
pub const MAX_REVIEW_LEN: usize = 2000;

/// Rating criterion key
pub const MAX_CRITERION_KEY_LEN: usize = 32;

// ── Cart / rating limits ────────────────────────────────────────────

/// Units of one product per cart line (after merging duplicates)
pub const MAX_LINE_QUANTITY: i32 = 9999;

/// Distinct products per cart
pub const MAX_CART_LINES: usize = 100;

/// Criteria per rating
pub const MAX_CRITERIA: usize = 10;

/// Stars and criterion values
pub const MIN_STARS: i32 = 1;
pub const MAX_STARS: i32 = 5;

// ── Helpers ─────────────────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(
            AppError::validation(format!("{field} must not be empty")).with_detail("field", field)
        );
    }
    validate_len(value, field, max_len)
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    match value {
        Some(v) => validate_len(v, field, max_len),
        None => Ok(()),
    }
}

fn validate_len(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({len} chars, max {max_len})"
        ))
        .with_detail("field", field));
    }
    Ok(())
}

/// Validate a 1..=5 score (stars or a criterion value)
pub fn validate_score(value: i32, field: &str) -> Result<(), AppError> {
    if !(MIN_STARS..=MAX_STARS).contains(&value) {
        return Err(AppError::with_message(
            ErrorCode::InvalidRating,
            format!("{field} must be between {MIN_STARS} and {MAX_STARS}, got {value}"),
        )
        .with_detail("field", field)
        .with_detail("value", value));
    }
    Ok(())
}

/// Trim an optional string, mapping blank to `None`
pub fn normalize_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
