//! Runtime adapter error types.

use thiserror::Error;

/// Errors a runtime implementation may surface.
///
/// The Docker implementation absorbs operational failures into
/// `Ok(false)` results; `Connect` is the one error that escapes, and
/// only during startup.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("docker connection failed: {0}")]
    Connect(#[source] bollard::errors::Error),

    #[error("docker api error: {0}")]
    Api(#[from] bollard::errors::Error),

    #[error("runtime unavailable: {0}")]
    Unavailable(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
