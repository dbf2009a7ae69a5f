//! Classification of remote broadcast responses.

use serde::{Deserialize, Serialize};

/// What a transport observed for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportResponse {
    /// Endpoint accepted the bytes and reported this hash.
    Accepted(String),
    /// Endpoint answered and refused. `status` is the HTTP status when the
    /// refusal came from the HTTP layer rather than a JSON-RPC error.
    Rejected { status: Option<u16>, message: String },
    /// No usable answer: connect failure, reset, timeout.
    Network(String),
}

/// Outcome class driving the retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Accepted,
    AlreadyKnown,
    RateLimited,
    NonceTooLow,
    Malformed,
    TransientNetworkError,
}

impl Classification {
    /// Whether the loop may submit again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Classification::RateLimited | Classification::TransientNetworkError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Accepted => "accepted",
            Classification::AlreadyKnown => "already_known",
            Classification::RateLimited => "rate_limited",
            Classification::NonceTooLow => "nonce_too_low",
            Classification::Malformed => "malformed",
            Classification::TransientNetworkError => "transient",
        }
    }
}

const ALREADY_KNOWN_MARKERS: &[&str] = &[
    "already known",
    "already in block chain",
    "already been processed",
    "txn-already-known",
    "txn-already-in-mempool",
    "transaction already exists",
    "alreadyprocessed",
];

const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "too many requests"];

const STALE_MARKERS: &[&str] = &[
    "nonce too low",
    "blockhash not found",
    "missingorspent",
    "missing inputs",
    "txn-mempool-conflict",
    "replacement transaction underpriced",
];

fn contains_any(message: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| message.contains(m))
}

/// Maps a transport response onto a [`Classification`].
///
/// Marker matching is case-insensitive and takes precedence over the HTTP
/// status, except that 429 always means rate limited.
pub fn classify(response: &TransportResponse) -> Classification {
    match response {
        TransportResponse::Accepted(_) => Classification::Accepted,
        TransportResponse::Network(_) => Classification::TransientNetworkError,
        TransportResponse::Rejected { status, message } => {
            let message = message.to_ascii_lowercase();
            if *status == Some(429) || contains_any(&message, RATE_LIMIT_MARKERS) {
                Classification::RateLimited
            } else if contains_any(&message, ALREADY_KNOWN_MARKERS) {
                Classification::AlreadyKnown
            } else if contains_any(&message, STALE_MARKERS) {
                Classification::NonceTooLow
            } else if matches!(status, Some(s) if *s >= 500 || *s == 408) {
                Classification::TransientNetworkError
            } else {
                Classification::Malformed
            }
        }
    }
}
