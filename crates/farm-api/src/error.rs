//! Desired-state client error types.

use thiserror::Error;

/// Errors from the desired-state fetch.
///
/// None of these are fatal to the process: the engine degrades every
/// variant to an empty desired list (with a warning) and carries on.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("control plane returned a non-array payload ({0})")]
    InvalidPayload(&'static str),

    #[error("desired-state fetch failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
}

pub type ApiResult<T> = Result<T, ApiError>;
