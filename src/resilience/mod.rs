//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Remote call (indexer, RPC, broadcast endpoint):
//!     → retries.rs (bounded attempts, stop on non-retryable errors)
//!     → backoff.rs (attempt * base_delay between attempts)
//! ```
//!
//! # Design Decisions
//! - Retry counts bound total latency; transports keep their own timeouts
//! - Money-affecting failures never enter a retry loop

pub mod backoff;
pub mod retries;

pub use retries::{retry_if, retry_with, RetryPolicy};
