use crate::error::ValidationError;
use crate::validate::validate_password_change;
use serde::{Deserialize, Serialize};

/// Answer of `GET /check-session`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /change-password`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChange {
    pub fn new(current: &str, new: &str, confirm: &str) -> Result<Self, ValidationError> {
        validate_password_change(current, new, confirm)?;
        Ok(Self {
            current_password: current.to_string(),
            new_password: new.to_string(),
            confirm_password: confirm.to_string(),
        })
    }
}

impl std::fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordChange").finish_non_exhaustive()
    }
}

/// Answer of `GET /password-hint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHint {
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub hint: String,
}
