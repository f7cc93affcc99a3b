//! Backend connection settings
//!
//! | Variable                    | Meaning                                   |
//! |-----------------------------|-------------------------------------------|
//! | `SUPABASE_URL`              | project URL (required)                    |
//! | `SUPABASE_ANON_KEY`         | public key, sent as `apikey`              |
//! | `SUPABASE_SERVICE_ROLE_KEY` | privileged key, preferred as bearer token |
//! | `SAFETRIP_ENV`              | `development`, `staging` or `production`  |
//! | `SAFETRIP_TIMEOUT_SECS`     | per-request timeout, default 30           |

use crate::error::{ApiError, ApiResult};
use safetrip_core::retry::{CircuitBreakerConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// `supabase start` listens here
const LOCAL_SUPABASE_URL: &str = "http://localhost:54321";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Deployment the client talks to. Decides how patient retries are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    /// Anything unrecognized is production
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "development" | "dev" | "local" => Self::Development,
            "staging" | "stage" => Self::Staging,
            _ => Self::Production,
        }
    }

    /// A developer at a terminal gets quick failures; production tracking
    /// keeps retrying in the background.
    #[must_use]
    pub fn retry_policy(self) -> RetryConfig {
        match self {
            Self::Development => RetryConfig::interactive(),
            Self::Staging => RetryConfig::default(),
            Self::Production => RetryConfig::background(),
        }
    }
}

/// Everything [`SafeTripClient`](crate::SafeTripClient) needs to reach the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Project URL without a trailing slash
    pub supabase_url: String,
    pub anon_key: Option<String>,
    pub service_role_key: Option<String>,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub environment: Environment,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_environment(LOCAL_SUPABASE_URL, Environment::default())
    }
}

impl ClientConfig {
    fn for_environment(url: &str, environment: Environment) -> Self {
        Self {
            supabase_url: url.trim_end_matches('/').to_string(),
            anon_key: None,
            service_role_key: None,
            timeout: DEFAULT_TIMEOUT,
            retry: environment.retry_policy(),
            circuit_breaker: CircuitBreakerConfig::default(),
            environment,
        }
    }

    /// Settings from the process environment
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Settings from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        let url = lookup("SUPABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ApiError::missing_env("SUPABASE_URL"))?;
        let environment = lookup("SAFETRIP_ENV").map_or_else(Environment::default, |v| Environment::parse(&v));

        let mut config = Self::for_environment(&url, environment);
        config.anon_key = lookup("SUPABASE_ANON_KEY");
        config.service_role_key = lookup("SUPABASE_SERVICE_ROLE_KEY");
        if let Some(secs) = lookup("SAFETRIP_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Local Supabase with short timeouts and keys taken from the environment
    #[must_use]
    pub fn development() -> Self {
        Self {
            anon_key: env::var("SUPABASE_ANON_KEY").ok(),
            service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY").ok(),
            timeout: Duration::from_secs(10),
            ..Self::for_environment(LOCAL_SUPABASE_URL, Environment::Development)
        }
    }

    #[must_use]
    pub fn functions_url(&self) -> String {
        format!("{}/functions/v1", self.supabase_url.trim_end_matches('/'))
    }

    #[must_use]
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url.trim_end_matches('/'))
    }

    /// Bearer token: the service role key when present, else the anon key
    #[must_use]
    pub fn bearer_key(&self) -> Option<&str> {
        self.service_role_key.as_deref().or(self.anon_key.as_deref())
    }

    #[must_use]
    pub fn with_supabase_url(mut self, url: impl Into<String>) -> Self {
        self.supabase_url = url.into();
        self
    }

    #[must_use]
    pub fn with_anon_key(mut self, key: impl Into<String>) -> Self {
        self.anon_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_service_role_key(mut self, key: impl Into<String>) -> Self {
        self.service_role_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_circuit_breaker(mut self, circuit_breaker: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    /// Reject settings that could never produce a working request
    pub fn validate(&self) -> ApiResult<()> {
        let url = self.supabase_url.as_str();
        if url.is_empty() {
            return Err(ApiError::config("supabase_url cannot be empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ApiError::config(format!("supabase_url must be http(s), got {url:?}")));
        }
        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ApiError::config("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }
}
