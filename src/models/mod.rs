//! Data models for the Blawg backend.
//!
//! Field names serialize in camelCase to match what the web frontend sends and reads.

mod author;
mod blog;
mod user;

pub use author::*;
pub use blog::*;
pub use user::*;

use crate::errors::AppError;

/// Reject a blank required field.
pub(crate) fn require(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}
