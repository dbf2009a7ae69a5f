//! Broadcaster subsystem.
//!
//! # Data Flow
//! ```text
//! SignedTransaction (hash computed before submission)
//!     → Broadcaster::submit (broadcaster.rs)
//!         → BroadcastTransport::send_raw (transport.rs, one per chain)
//!         → classify (classify.rs)
//!             ├── Accepted / AlreadyKnown → BroadcastOutcome { local hash }
//!             ├── RateLimited / Transient → linear backoff, next attempt
//!             └── NonceTooLow / Malformed → error, no further attempt
//! ```
//!
//! # Design Decisions
//! - Explicit bounded loop; the attempt counter is the only retry state
//! - The outcome hash is always the local one, so `AlreadyKnown` loses nothing

pub mod broadcaster;
pub mod classify;
pub mod transport;

pub use broadcaster::{BroadcastOutcome, Broadcaster, Disposition};
pub use classify::{classify, Classification, TransportResponse};
pub use transport::{BroadcastTransport, EsploraTransport, EvmTransport, SolanaTransport};
