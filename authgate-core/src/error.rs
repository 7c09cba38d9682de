use thiserror::Error;

/// Local, pre-network rejection. Never reaches the server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("API path is required")]
    EmptyPath,

    #[error("API path must start with a slash (/): {0}")]
    PathWithoutSlash(String),

    #[error("All password fields are required")]
    PasswordFieldsMissing,

    #[error("New password and confirmation do not match")]
    PasswordMismatch,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Select a file to import")]
    NoImportFile,

    #[error("Import file must be a .json file: {0}")]
    ImportNotJson(String),

    #[error("Import file must contain a JSON array of entries")]
    ImportNotArray,
}

/// Unified error type for the console.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// 401 from any endpoint. Callers treat this as a redirect to login,
    /// never as an ordinary failure.
    #[error("Authentication required")]
    Unauthorized,

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Coarse classification used by the controller to pick a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    Server,
    Network,
    Other,
}

impl GateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::Validation(_) => ErrorKind::Validation,
            GateError::Unauthorized => ErrorKind::Auth,
            GateError::Server { .. } => ErrorKind::Server,
            GateError::Network(_) => ErrorKind::Network,
            _ => ErrorKind::Other,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GateError::Unauthorized)
    }

    /// Text for a transient notification.
    ///
    /// Validation errors and server errors carrying a message are shown
    /// verbatim; everything else falls back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            GateError::Validation(v) => v.to_string(),
            GateError::Server { message, .. } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}
