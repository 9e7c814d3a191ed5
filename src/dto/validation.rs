//! Validation helpers for request DTOs.

use time::PrimitiveDateTime;
use validator::ValidationError;

use crate::dto::common::utc_now;

/// Validates that a timestamp lies strictly in the future (UTC).
pub fn validate_future_timestamp(value: &PrimitiveDateTime) -> Result<(), ValidationError> {
    check_future(value, utc_now())
}

/// Same check as [`validate_future_timestamp`] against an explicit clock.
pub fn check_future(
    value: &PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Result<(), ValidationError> {
    if *value <= now {
        let mut err = ValidationError::new("timestamp_not_in_future");
        err.message = Some("Scheduled time must be in the future".into());
        return Err(err);
    }
    Ok(())
}
