//! Local checks performed before any request is issued.

use crate::entry::ImportRecord;
use crate::error::ValidationError;
use std::path::Path;

/// Minimum admin password length accepted by the backend.
pub const MIN_PASSWORD_LEN: usize = 4;

/// Trim `raw` and require a leading `/`. Returns the trimmed path.
pub fn validate_path(raw: &str) -> Result<String, ValidationError> {
    let path = raw.trim();
    if path.is_empty() {
        return Err(ValidationError::EmptyPath);
    }
    if !path.starts_with('/') {
        return Err(ValidationError::PathWithoutSlash(path.to_string()));
    }
    Ok(path.to_string())
}

/// Check the three password fields of the change-password dialog.
pub fn validate_password_change(
    current: &str,
    new: &str,
    confirm: &str,
) -> Result<(), ValidationError> {
    if current.is_empty() || new.is_empty() || confirm.is_empty() {
        return Err(ValidationError::PasswordFieldsMissing);
    }
    if new != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Require a `.json` file name.
pub fn validate_import_file(path: Option<&Path>) -> Result<(), ValidationError> {
    let path = path.ok_or(ValidationError::NoImportFile)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(ValidationError::ImportNotJson(path.display().to_string()));
    }
    Ok(())
}

/// Parse import file contents. The top level must be a JSON array; the
/// elements are checked by the server.
pub fn parse_import_records(contents: &str) -> Result<Vec<ImportRecord>, ValidationError> {
    match serde_json::from_str::<serde_json::Value>(contents) {
        Ok(serde_json::Value::Array(items)) => Ok(items),
        _ => Err(ValidationError::ImportNotArray),
    }
}
