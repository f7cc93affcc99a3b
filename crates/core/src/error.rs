//! Coded errors for the CLI boundary
//!
//! Library crates keep their own `thiserror` enums. The binary converts them
//! into [`Error`], which adds a stable code (`E4002`), optional context and a
//! recovery hint, and decides the process exit status.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Family of an [`ErrorCode`], given by its thousands digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    General,
    Io,
    Config,
    Validation,
    Location,
    Sync,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::General => "General",
            Self::Io => "IO",
            Self::Config => "Configuration",
            Self::Validation => "Validation",
            Self::Location => "Location",
            Self::Sync => "Sync",
        })
    }
}

/// Stable error codes for scripting against the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum ErrorCode {
    Unknown = 1000,
    Internal = 1001,
    Timeout = 1002,

    IoError = 2000,
    FileNotFound = 2001,
    PermissionDenied = 2002,

    ConfigError = 3000,
    ConfigNotFound = 3001,
    ConfigParseError = 3002,
    InvalidConfigValue = 3003,

    ValidationError = 4000,
    InvalidInput = 4001,
    InvalidCoordinate = 4002,
    InvalidGeofence = 4003,

    LocationError = 5000,
    LocationUnavailable = 5001,
    TrackerBusy = 5002,

    SyncError = 6000,
    PersistenceFailed = 6001,
    RegistryUnavailable = 6002,
    NetworkError = 6003,
}

impl ErrorCode {
    /// Numeric value, e.g. `4002`
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn category(self) -> Category {
        match self.code() / 1000 {
            2 => Category::Io,
            3 => Category::Config,
            4 => Category::Validation,
            5 => Category::Location,
            6 => Category::Sync,
            _ => Category::General,
        }
    }

    /// Process exit status; everything in a category shares one, except timeouts
    pub fn exit_code(self) -> i32 {
        match self.category() {
            _ if self == Self::Timeout => exit_codes::TIMEOUT,
            Category::Config => exit_codes::CONFIG_ERROR,
            Category::Validation => exit_codes::VALIDATION_ERROR,
            Category::Location => exit_codes::LOCATION_ERROR,
            Category::Sync => exit_codes::SYNC_ERROR,
            Category::General | Category::Io => exit_codes::FAILURE,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Error carried to the user, with code, context and hint
#[derive(Error, Debug)]
pub struct Error {
    /// What went wrong, as a stable code
    pub code: ErrorCode,
    /// One-line description
    pub message: String,
    /// Where it happened, e.g. which file was being read
    pub context: Option<String>,
    /// What the user can do about it
    pub suggestion: Option<String>,
    /// Underlying cause
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(context) = &self.context {
            write!(f, " ({context})")?;
        }
        Ok(())
    }
}

impl Error {
    #[allow(missing_docs)]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Attach context; an existing context is kept as the inner part
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = Some(match self.context.take() {
            Some(inner) => format!("{context}: {inner}"),
            None => context,
        });
        self
    }

    #[must_use]
    #[allow(missing_docs)]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    #[allow(missing_docs)]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[allow(missing_docs)]
    pub fn exit_code(&self) -> i32 {
        self.code.exit_code()
    }

    /// Machine readable form for `--format json`
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code.to_string(),
            kind: self.code,
            category: self.code.category(),
            message: self.message.clone(),
            context: self.context.clone(),
            suggestion: self.suggestion.clone(),
            cause: self.source.as_ref().map(ToString::to_string),
        }
    }

    #[allow(missing_docs)]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    #[allow(missing_docs)]
    pub fn config_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create a .safetrip.toml file or pass --config with an existing path")
    }

    #[allow(missing_docs)]
    pub fn invalid_config_value(key: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfigValue, format!("Invalid value for {key}: {}", reason.into()))
    }

    #[allow(missing_docs)]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    #[allow(missing_docs)]
    pub fn invalid_coordinate(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidCoordinate, message)
            .with_suggestion("Latitude must be within [-90, 90] and longitude within [-180, 180]")
    }

    #[allow(missing_docs)]
    pub fn location_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::LocationUnavailable, message)
            .with_suggestion("Check that location services are enabled, then start tracking again")
    }

    #[allow(missing_docs)]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, message)
            .with_suggestion("Check SUPABASE_URL and your network connection")
    }
}

/// JSON shape of an [`Error`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ErrorReport {
    /// Display form, e.g. `E5001`
    pub code: String,
    pub kind: ErrorCode,
    pub category: Category,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

/// Result with [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit statuses
#[allow(missing_docs)]
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const VALIDATION_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const LOCATION_ERROR: i32 = 4;
    pub const SYNC_ERROR: i32 = 5;
    pub const TIMEOUT: i32 = 124;
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            std::io::ErrorKind::TimedOut => ErrorCode::Timeout,
            _ => ErrorCode::IoError,
        };
        Self::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorCode::InvalidInput, format!("Invalid JSON: {err}")).with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::new(ErrorCode::ConfigParseError, format!("Invalid TOML: {err}")).with_source(err)
    }
}

/// `context` and `with_suggestion` directly on a [`Result`]
pub trait ResultExt<T> {
    #[allow(missing_docs)]
    fn context(self, context: impl Into<String>) -> Result<T>;
    #[allow(missing_docs)]
    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_suggestion(suggestion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_display() {
        assert_eq!(ErrorCode::FileNotFound.to_string(), "E2001");
        assert_eq!(ErrorCode::InvalidCoordinate.to_string(), "E4002");
    }

    #[test]
    fn test_category_from_thousands() {
        assert_eq!(ErrorCode::IoError.category(), Category::Io);
        assert_eq!(ErrorCode::InvalidCoordinate.category(), Category::Validation);
        assert_eq!(ErrorCode::RegistryUnavailable.category(), Category::Sync);
        assert_eq!(ErrorCode::Timeout.category(), Category::General);
        assert_eq!(Category::Config.to_string(), "Configuration");
    }

    #[test]
    fn test_exit_codes_follow_category() {
        assert_eq!(ErrorCode::InvalidCoordinate.exit_code(), exit_codes::VALIDATION_ERROR);
        assert_eq!(ErrorCode::ConfigParseError.exit_code(), exit_codes::CONFIG_ERROR);
        assert_eq!(ErrorCode::LocationUnavailable.exit_code(), exit_codes::LOCATION_ERROR);
        assert_eq!(ErrorCode::NetworkError.exit_code(), exit_codes::SYNC_ERROR);
        assert_eq!(ErrorCode::Timeout.exit_code(), exit_codes::TIMEOUT);
        assert_eq!(ErrorCode::FileNotFound.exit_code(), exit_codes::FAILURE);
    }

    #[test]
    fn test_context_nests() {
        let err = Error::validation("track is empty")
            .with_context("reading walk.json")
            .with_context("replay");
        assert_eq!(err.context.as_deref(), Some("replay: reading walk.json"));
        assert_eq!(err.to_string(), "[E4000] track is empty (replay: reading walk.json)");
    }

    #[test]
    fn test_report_json() {
        let err = Error::location_unavailable("No fix within 10s").with_context("tracker start");
        let json = serde_json::to_value(err.to_report()).unwrap();

        assert_eq!(json["code"], "E5001");
        assert_eq!(json["kind"], "LOCATION_UNAVAILABLE");
        assert_eq!(json["category"], "location");
        assert!(json.get("cause").is_none());
        assert!(json["suggestion"].as_str().unwrap().contains("location services"));
    }

    #[test]
    fn test_io_error_mapping() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.code, ErrorCode::FileNotFound);
        assert!(err.source.is_some());
        assert_eq!(err.to_report().cause.as_deref(), Some("gone"));
    }
}
