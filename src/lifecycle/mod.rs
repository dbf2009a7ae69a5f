//! Transaction lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! create_send → record BUILDING (money fields fixed here)
//!     → sign       → SIGNED        (signed bytes + local hash)
//!     → broadcast  → BROADCASTING  (persisted before the network call)
//!                  → SUCCESS | FAILED
//! ```
//!
//! # Design Decisions
//! - Every store applies the same guard (store.rs) on save
//! - Terminal states are never overwritten
//! - Callers get copies; the store owns the record

pub mod file;
pub mod memory;
pub mod record;
pub mod store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::{now_secs, Failure, SendTransactionRecord, TxStatus};
pub use store::{check_update, TransactionStore};
