//! Shared foundations for the SafeTrip tools
//!
//! - **Error handling**: coded errors with context and recovery suggestions
//! - **Configuration**: TOML-based tracking and logging settings
//! - **Resilience**: retry backoff and a circuit breaker for backend calls
//!
//! # Example
//!
//! ```rust,no_run
//! use safetrip_core::config::Config;
//!
//! let config = Config::load(None).expect("valid configuration");
//! println!("fix timeout: {:?}", config.schema.tracking.fix_timeout());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod retry;

pub use error::{Category, Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema, LoggingConfig, TrackingConfig};
    pub use crate::error::{exit_codes, Category, Error, ErrorCode, Result, ResultExt};
    pub use crate::retry::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig};
}
