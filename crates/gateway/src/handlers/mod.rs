//! API handlers module

pub mod health;
pub mod papers;

use paperscout_common::errors::{AppError, Result};
use validator::Validate;

/// Run derive-based validation, reporting the first offending field
pub(crate) fn validate_body<T: Validate>(body: &T) -> Result<()> {
    body.validate().map_err(|e| AppError::Validation {
        field: e.field_errors().keys().next().map(|field| field.to_string()),
        message: e.to_string(),
    })
}
