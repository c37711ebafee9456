//! Error types for Polyscan

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolyscanError {
    // Format errors
    #[error("Unsupported file type: .{extension} (supported: {})", supported.join(", "))]
    UnsupportedFormat {
        extension: String,
        supported: Vec<String>,
    },

    #[error("{format} error: {message}")]
    FormatError { format: String, message: String },

    #[error("Invalid geometry at feature {feature}: {reason}")]
    InvalidGeometry { feature: String, reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Remote service errors
    #[error("API request failed with status code {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Rate limit still exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("API request error: {reason}")]
    Network { reason: String, transient: bool },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PolyscanError {
    /// True for failures that came back from (or never reached) the remote
    /// service, as opposed to local input problems.
    pub fn is_retrieval_error(&self) -> bool {
        matches!(
            self,
            PolyscanError::Http { .. }
                | PolyscanError::RateLimited { .. }
                | PolyscanError::Network { .. }
                | PolyscanError::InvalidResponse { .. }
        )
    }
}

impl From<serde_json::Error> for PolyscanError {
    fn from(err: serde_json::Error) -> Self {
        PolyscanError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PolyscanError>;
