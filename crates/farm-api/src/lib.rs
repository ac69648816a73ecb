//! farm-api: desired-state client for the trading journal control
//! plane.
//!
//! One authenticated read per reconciliation pass, with bounded retry
//! for transient failures. Payload entries are parsed into typed
//! [`farm_core::TerminalSpec`]s at this boundary, so the engine never
//! sees loosely shaped JSON.

pub mod client;
pub mod error;

pub use client::{ApiClient, RetryPolicy, SECRET_HEADER};
pub use error::{ApiError, ApiResult};
