//! Username records keyed by email.

use serde::Deserialize;

use super::require;
use crate::errors::AppError;

/// Request body for POST /api/user/{email}.
#[derive(Debug, Clone, Deserialize)]
pub struct SetUsernameRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: String,
}

impl SetUsernameRequest {
    /// The body email, when given, must agree with the path.
    pub fn validate(&self, path_email: &str) -> Result<(), AppError> {
        require(&self.username, "username")?;
        match &self.email {
            Some(email) if email != path_email => Err(AppError::Validation(
                "email in body does not match the path".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
