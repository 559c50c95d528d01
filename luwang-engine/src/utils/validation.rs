//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! The store enforces no lengths itself; everything is checked here
//! before a transaction opens.

use shared::DomainError;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: fields, workers
pub const MAX_NAME_LEN: usize = 200;

/// Plot locations (free text, unique per field)
pub const MAX_LOCATION_LEN: usize = 200;

/// Notes, adjustment reasons
pub const MAX_NOTE_LEN: usize = 500;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::invalid_input(format!(
            "{field} must not be empty"
        )));
    }
    if value.len() > max_len {
        return Err(DomainError::invalid_input(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is non-empty and within the limit.
pub fn validate_optional_text(
    value: Option<&str>,
    field: &str,
    max_len: usize,
) -> Result<(), DomainError> {
    match value {
        Some(v) => validate_required_text(v, field, max_len),
        None => Ok(()),
    }
}

/// Validate that a boundary amount is a finite number
pub fn validate_finite(value: f64, field: &str) -> Result<(), DomainError> {
    if !value.is_finite() {
        return Err(DomainError::invalid_input(format!(
            "{field} must be a finite number, got {value}"
        )));
    }
    Ok(())
}

/// Validate a strictly positive boundary amount
pub fn validate_positive(value: f64, field: &str) -> Result<(), DomainError> {
    validate_finite(value, field)?;
    if value <= 0.0 {
        return Err(DomainError::invalid_input(format!(
            "{field} must be greater than zero, got {value}"
        )));
    }
    Ok(())
}

/// Validate a non-negative boundary amount
pub fn validate_non_negative(value: f64, field: &str) -> Result<(), DomainError> {
    validate_finite(value, field)?;
    if value < 0.0 {
        return Err(DomainError::invalid_input(format!(
            "{field} must not be negative, got {value}"
        )));
    }
    Ok(())
}
