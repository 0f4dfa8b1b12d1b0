//! Network layer - single bounded-timeout HTTP execution
//!
//! The executor never raises: connection failures, timeouts and invalid
//! URLs come back as an [`ExecutionResult`] without a status.

pub mod client;

pub use client::{create_client, parse_structured, ExecutionResult, Executor, NetworkError};
