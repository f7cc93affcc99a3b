//! Backend client
//!
//! Two kinds of calls reach Supabase: edge function invocations (POST with a
//! JSON body) and PostgREST table reads (GET with a query string). Both go
//! through the same attempt loop, which consults the circuit breaker before
//! every attempt and tags each call with a correlation id.

use crate::config::ClientConfig;
use crate::endpoints::{GeofencesApi, LocationApi};
use crate::error::{ApiError, ApiResult};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use safetrip_core::retry::{CircuitBreaker, CircuitState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "X-Request-ID";
const APIKEY_HEADER: &str = "apikey";

/// Handle to the SafeTrip backend. Cheap to clone; clones share the breaker.
#[derive(Clone)]
pub struct SafeTripClient {
    http: Client,
    config: Arc<ClientConfig>,
    breaker: Arc<CircuitBreaker>,
}

impl SafeTripClient {
    /// Client configured from `SUPABASE_*` environment variables
    pub fn new() -> ApiResult<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Client for an explicit configuration
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(auth_headers(&config)?)
            .build()?;
        let breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker.clone()));

        Ok(Self {
            http,
            config: Arc::new(config),
            breaker,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Close the breaker again, e.g. after the user fixed connectivity
    pub fn reset_circuit(&self) {
        self.breaker.reset();
    }

    /// The `location-tracker` edge function
    #[must_use]
    pub fn location(&self) -> LocationApi {
        LocationApi::new(self.clone())
    }

    /// The `geofences` table
    #[must_use]
    pub fn geofences(&self) -> GeofencesApi {
        GeofencesApi::new(self.clone())
    }

    /// Invoke edge function `function` with a JSON body
    #[instrument(skip(self, body), fields(request_id))]
    pub async fn invoke<T, B>(&self, function: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let url = format!("{}/{function}", self.config.functions_url());
        self.call(&url, |http, url| http.post(url).json(body)).await
    }

    /// Read rows of `table`; `query` holds PostgREST filter pairs such as
    /// `("user_id", "eq.42")`, encoded by reqwest
    #[instrument(skip(self, query), fields(request_id))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> ApiResult<Vec<T>> {
        let url = format!("{}/{table}", self.config.rest_url());
        self.call(&url, |http, url| http.get(url).query(query)).await
    }

    /// Attempt loop shared by every call. `build` creates a fresh request per attempt.
    async fn call<T, F>(&self, url: &str, build: F) -> ApiResult<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let policy = &self.config.retry;
        let mut attempt = 0;
        loop {
            if !self.breaker.allow() {
                warn!(%request_id, %url, attempt, "Backend circuit open, not sending");
                return Err(ApiError::CircuitOpen);
            }

            let started = Instant::now();
            let sent = build(&self.http, url)
                .header(REQUEST_ID_HEADER, &request_id)
                .send()
                .await;
            let outcome = match sent {
                Ok(response) => decode(response).await,
                Err(e) => Err(ApiError::from(e)),
            };
            attempt += 1;

            let error = match outcome {
                Ok(value) => {
                    self.breaker.record_success();
                    debug!(%request_id, attempt, elapsed_ms = started.elapsed().as_millis() as u64, "Backend call ok");
                    return Ok(value);
                }
                Err(e) => e,
            };

            // A rejected request says nothing about backend health
            if !error.is_client_error() {
                self.breaker.record_failure();
            }

            if !error.is_retryable() {
                debug!(%request_id, attempt, %error, "Backend call failed");
                return Err(error);
            }
            if attempt >= policy.max_attempts {
                return Err(ApiError::RetriesExhausted {
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }

            let delay = policy.delay_for_attempt(attempt);
            debug!(%request_id, attempt, %error, delay_ms = delay.as_millis() as u64, "Backend call failed, backing off");
            tokio::time::sleep(delay).await;
        }
    }
}

fn auth_headers(config: &ClientConfig) -> ApiResult<HeaderMap> {
    let header = |value: &str| {
        HeaderValue::from_str(value).map_err(|_| ApiError::config("API key contains invalid header characters"))
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("safetrip-api-client/", env!("CARGO_PKG_VERSION"))),
    );
    // Supabase wants the public key in `apikey` even when a service key authorizes
    if let Some(key) = config.anon_key.as_deref().or(config.service_role_key.as_deref()) {
        headers.insert(APIKEY_HEADER, header(key)?);
    }
    if let Some(key) = config.bearer_key() {
        headers.insert(AUTHORIZATION, header(&format!("Bearer {key}"))?);
    }
    Ok(headers)
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::api_response(status.as_u16(), error_message(&body)));
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// `error` or `message` from a JSON error body, else the body itself
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "message"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}
