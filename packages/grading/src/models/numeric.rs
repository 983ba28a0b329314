//! Range checks and rounding for threshold and mark fields.
//!
//! Values are validated first and rounded to 2 decimals afterwards; the two
//! steps do not commute at the range edges (`1.004` rounds into range).

use crate::error::ValidationError;

pub const MAX_NAME_LEN: usize = 255;
pub const MARK_MIN: f64 = 0.0;
pub const MARK_MAX: f64 = 10.0;

/// Round to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn in_range(field: &str, value: f64, min: f64, max: f64) -> Result<f64, ValidationError> {
    if value.is_nan() || value < min || value > max {
        return Err(ValidationError(format!(
            "{field} must be between {min:.1} and {max:.1}"
        )));
    }
    Ok(round2(value))
}

/// Validate a confidence or certainty threshold in [0, 1].
pub fn validate_threshold(field: &str, value: f64) -> Result<f64, ValidationError> {
    in_range(field, value, 0.0, 1.0)
}

/// Validate a mark in [0, 10].
pub fn validate_mark(value: f64) -> Result<f64, ValidationError> {
    in_range("Mark", value, MARK_MIN, MARK_MAX)
}

/// Validate a display name: non-empty and at most 255 characters.
pub fn validate_name(field: &str, value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if value.trim().is_empty() || len > MAX_NAME_LEN {
        return Err(ValidationError(format!(
            "{field} must be between 1 and {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Storage-side normalization: clamp into `[min, max]`, then round.
///
/// The repository never rejects values; callers validate beforehand.
pub(crate) fn clamp_round(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    round2(value.clamp(min, max))
}

/// Whether a persisted value is a legal stored form.
pub(crate) fn stored_in_range(value: f64, min: f64, max: f64) -> bool {
    !value.is_nan() && (min..=max).contains(&value)
}
