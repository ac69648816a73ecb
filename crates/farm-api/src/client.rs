//! HTTP client for the orchestrator config endpoint.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use farm_core::{OrchestratorConfig, TerminalSpec};

use crate::error::{ApiError, ApiResult};

/// Header carrying the orchestrator's shared secret.
pub const SECRET_HEADER: &str = "x-orchestrator-secret";

const CONFIG_PATH: &str = "/api/orchestrator/config";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry policy for the desired-state fetch.
///
/// The delay grows linearly with the attempt number; with the default
/// three attempts that means 2s after the first failure and 4s after
/// the second.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given 1-based failed attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Client for the control plane's orchestrator config endpoint.
pub struct ApiClient {
    http: reqwest::Client,
    config_url: String,
    secret: String,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Build a client from the orchestrator configuration.
    pub fn new(config: &OrchestratorConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            http,
            config_url: format!("{}{CONFIG_PATH}", config.journal_url.trim_end_matches('/')),
            secret: config.orchestrator_secret.clone(),
            retry: RetryPolicy::default(),
        })
    }

    /// Override the retry policy (tests use millisecond delays).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch the desired terminal list from the control plane.
    ///
    /// Transport errors and non-2xx responses are retried per the
    /// policy. A structurally invalid payload (non-array top level) is
    /// not retried: the control plane answered, just not with a config
    /// list.
    pub async fn fetch_desired(&self) -> ApiResult<Vec<TerminalSpec>> {
        let mut attempt = 1;
        loop {
            match self.try_fetch().await {
                Ok(specs) => return Ok(specs),
                Err(ApiError::Http(err)) if attempt < self.retry.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %err,
                        "desired-state fetch failed, retrying"
                    );
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                    attempt += 1;
                }
                Err(ApiError::Http(err)) => {
                    return Err(ApiError::RetriesExhausted {
                        attempts: attempt,
                        source: err,
                    });
                }
                Err(other) => return Err(other),
            }
        }
    }

    async fn try_fetch(&self) -> ApiResult<Vec<TerminalSpec>> {
        let response = self
            .http
            .get(&self.config_url)
            .header(SECRET_HEADER, &self.secret)
            .send()
            .await?
            .error_for_status()?;

        let payload: Value = response.json().await?;
        let specs = parse_specs(&payload)?;
        info!(count = specs.len(), "fetched terminal configs from control plane");
        Ok(specs)
    }
}

/// Parse the raw payload into typed specs.
///
/// The top level must be an array. Individual entries that fail to
/// deserialize, or that carry an empty id, are skipped with a warning
/// so one bad entry never discards the whole batch.
fn parse_specs(payload: &Value) -> ApiResult<Vec<TerminalSpec>> {
    let Some(entries) = payload.as_array() else {
        return Err(ApiError::InvalidPayload(json_type_name(payload)));
    };

    let mut specs = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<TerminalSpec>(entry.clone()) {
            Ok(spec) if spec.id.is_empty() => {
                warn!("skipping desired-state entry with empty id");
            }
            Ok(spec) => {
                debug!(terminal = %spec.id, status = ?spec.status, "parsed desired-state entry");
                specs.push(spec);
            }
            Err(err) => {
                warn!(error = %err, "skipping malformed desired-state entry");
            }
        }
    }
    Ok(specs)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
