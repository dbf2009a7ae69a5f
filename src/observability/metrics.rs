//! Metrics collection.
//!
//! # Metrics
//! - `send_fee_fallback_total` (counter): fee quotes served from the static table, by chain
//! - `send_utxo_dropped_total` (counter): outputs skipped because their parent could not be resolved
//! - `send_broadcast_attempts_total` (counter): transport submissions, by chain
//! - `send_broadcast_outcomes_total` (counter): classified broadcast results, by chain and outcome
//! - `send_transitions_total` (counter): persisted status changes, by chain and status
//!
//! Recording is a no-op until the host process installs a `metrics` recorder.

use metrics::counter;

use crate::chain::Chain;

pub fn record_fee_fallback(chain: Chain) {
    counter!("send_fee_fallback_total", "chain" => chain.as_str()).increment(1);
}

pub fn record_utxo_dropped(chain: Chain) {
    counter!("send_utxo_dropped_total", "chain" => chain.as_str()).increment(1);
}

pub fn record_broadcast_attempt(chain: Chain) {
    counter!("send_broadcast_attempts_total", "chain" => chain.as_str()).increment(1);
}

pub fn record_broadcast_outcome(chain: Chain, outcome: &'static str) {
    counter!("send_broadcast_outcomes_total", "chain" => chain.as_str(), "outcome" => outcome)
        .increment(1);
}

pub fn record_transition(chain: Chain, status: &'static str) {
    counter!("send_transitions_total", "chain" => chain.as_str(), "status" => status).increment(1);
}
