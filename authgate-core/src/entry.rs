use crate::error::ValidationError;
use crate::validate::validate_path;
use crate::wire::{flexible_bool, null_as_default, timestamp};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Maximum number of per-record import errors kept in a report.
pub const IMPORT_ERROR_SAMPLE: usize = 10;

/// One permitted API path with metadata and its usage counter.
///
/// Owned by the server; the console keeps a read-mostly copy that is
/// replaced wholesale on every accepted fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistEntry {
    /// Server-assigned identifier
    pub id: i64,

    /// Permitted path, always starting with `/`
    #[serde(rename = "api_path", alias = "path")]
    pub path: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(default = "default_enabled", deserialize_with = "flexible_bool")]
    pub enabled: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub call_count: u64,

    #[serde(default, with = "timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

fn default_enabled() -> bool {
    true
}

impl AllowlistEntry {
    /// Case-insensitive match of `needle` against path and description.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.path.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// Body of `POST /add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub api_path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl NewEntry {
    /// Build a validated entry. Path and description are trimmed.
    pub fn new(
        path: &str,
        description: &str,
        enabled: bool,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            api_path: validate_path(path)?,
            description: description.trim().to_string(),
            enabled,
        })
    }
}

/// Body of `PUT /update/{id}`. Absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl EntryPatch {
    /// Patch that only flips the enabled flag.
    pub fn toggle(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    /// Edit as submitted from the edit dialog. `enabled: None` leaves the
    /// server-side flag untouched.
    pub fn edit(path: &str, description: &str, enabled: Option<bool>) -> Result<Self, ValidationError> {
        Ok(Self {
            api_path: Some(validate_path(path)?),
            description: Some(description.trim().to_string()),
            enabled,
        })
    }

    /// Re-check the path, if any. Called before any request goes out.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(path) = &self.api_path {
            validate_path(path)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.api_path.is_none() && self.description.is_none() && self.enabled.is_none()
    }

    /// Apply the patch to a cached entry.
    pub fn apply_to(&self, entry: &mut AllowlistEntry) {
        if let Some(path) = &self.api_path {
            entry.path = path.clone();
        }
        if let Some(description) = &self.description {
            entry.description = description.clone();
        }
        if let Some(enabled) = self.enabled {
            entry.enabled = enabled;
        }
    }
}

/// Which call counters to reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTarget {
    One(i64),
    All,
}

/// One element of an import file. Kept as raw JSON so the server can report
/// per-record problems (missing `api_path`, bad prefix) itself.
pub type ImportRecord = serde_json::Value;

/// Result of a bulk import. Partial failures are not rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub imported_count: u64,
    #[serde(default)]
    pub error_count: u64,
    #[serde(default)]
    pub total_in_database: Option<u64>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ImportReport {
    /// Clamp the error sample to [`IMPORT_ERROR_SAMPLE`].
    pub fn bounded(mut self) -> Self {
        self.errors.truncate(IMPORT_ERROR_SAMPLE);
        self
    }

    pub fn is_partial(&self) -> bool {
        self.error_count > 0 && self.imported_count > 0
    }
}

/// Where the server wrote an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReceipt {
    #[serde(default)]
    pub message: String,
    pub export_path: String,
    #[serde(default)]
    pub api_count: u64,
}

/// Answer of the authorization check endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCheck {
    pub api_path: String,
    #[serde(deserialize_with = "flexible_bool")]
    pub authorized: bool,
    #[serde(default)]
    pub message: String,
}
