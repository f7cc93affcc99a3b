//! Error types for the API client

use safetrip_tracker::{PersistenceError, RegistryError};
use thiserror::Error;

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API client errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing environment variable
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    ApiResponse {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },

    /// The edge function answered 200 but reported failure
    #[error("{function} failed: {message}")]
    FunctionFailed {
        /// Edge function name
        function: String,
        /// Error message from the function body
        message: String,
    },

    /// The request was refused before being sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Circuit breaker is open
    #[error("Circuit breaker is open - service temporarily unavailable")]
    CircuitOpen,

    /// All retry attempts exhausted
    #[error("All {attempts} retry attempts failed: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last error message
        last_error: String,
    },
}

impl ApiError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing env var error
    pub fn missing_env(var: impl Into<String>) -> Self {
        Self::MissingEnvVar(var.into())
    }

    /// Create an API response error
    pub fn api_response(status: u16, message: impl Into<String>) -> Self {
        Self::ApiResponse {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            Self::ApiResponse { status, .. } => *status >= 500 || *status == 429,
            Self::CircuitOpen
            | Self::Config(_)
            | Self::MissingEnvVar(_)
            | Self::Json(_)
            | Self::FunctionFailed { .. }
            | Self::InvalidRequest(_)
            | Self::RetriesExhausted { .. } => false,
        }
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiResponse { status, .. } if (400..500).contains(status))
    }

    /// Check if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiResponse { status, .. } if *status >= 500)
    }

    /// Whether the backend was never reached or kept failing, as opposed to
    /// answering with a definite refusal
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Request(_) | Self::CircuitOpen | Self::RetriesExhausted { .. } => true,
            Self::ApiResponse { .. } => self.is_server_error(),
            _ => false,
        }
    }
}

impl From<ApiError> for PersistenceError {
    fn from(e: ApiError) -> Self {
        if e.is_unreachable() {
            PersistenceError::Unreachable(e.to_string())
        } else {
            PersistenceError::Rejected(e.to_string())
        }
    }
}

impl From<ApiError> for RegistryError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Json(_) => RegistryError::Malformed(e.to_string()),
            _ => RegistryError::Unreachable(e.to_string()),
        }
    }
}

impl From<ApiError> for safetrip_core::Error {
    fn from(e: ApiError) -> Self {
        match &e {
            ApiError::Config(_) | ApiError::MissingEnvVar(_) => {
                safetrip_core::Error::config(e.to_string())
            }
            _ => safetrip_core::Error::network(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(ApiError::api_response(503, "down").is_retryable());
        assert!(ApiError::api_response(429, "slow down").is_retryable());
        assert!(!ApiError::api_response(400, "bad").is_retryable());
        assert!(!ApiError::CircuitOpen.is_retryable());
    }

    #[test]
    fn test_persistence_mapping() {
        let rejected: PersistenceError = ApiError::api_response(400, "bad row").into();
        assert!(matches!(rejected, PersistenceError::Rejected(_)));

        let unreachable: PersistenceError = ApiError::CircuitOpen.into();
        assert!(matches!(unreachable, PersistenceError::Unreachable(_)));

        let server: PersistenceError = ApiError::api_response(502, "gateway").into();
        assert!(matches!(server, PersistenceError::Unreachable(_)));
    }

    #[test]
    fn test_registry_mapping() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let malformed: RegistryError = ApiError::Json(json_err).into();
        assert!(matches!(malformed, RegistryError::Malformed(_)));
    }
}
