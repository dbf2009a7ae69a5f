//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! fees / broadcast / engine produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters via the metrics facade)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Every record transition is logged with the record ID
//! - Metrics are cheap (atomic increments) and exporter-agnostic

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
