//! Bounded submission loop.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::broadcast::classify::{classify, Classification, TransportResponse};
use crate::broadcast::transport::BroadcastTransport;
use crate::error::{SendError, SendResult};
use crate::observability::metrics;
use crate::resilience::RetryPolicy;
use crate::signer::SignedTransaction;

/// How the network ended up holding the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    Accepted,
    /// The network already had it; treated as accepted.
    AlreadyKnown,
}

/// Successful broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastOutcome {
    /// Locally computed hash of the signed bytes.
    pub hash: String,
    /// Submissions made, including the successful one.
    pub attempts: u32,
    pub disposition: Disposition,
}

fn provider_message(response: &TransportResponse) -> String {
    match response {
        TransportResponse::Accepted(hash) => hash.clone(),
        TransportResponse::Rejected { status: Some(status), message } => format!("HTTP {}: {}", status, message),
        TransportResponse::Rejected { status: None, message } => message.clone(),
        TransportResponse::Network(message) => message.clone(),
    }
}

/// Submits signed transactions through one transport with a [`RetryPolicy`].
#[derive(Clone)]
pub struct Broadcaster {
    transport: Arc<dyn BroadcastTransport>,
    policy: RetryPolicy,
}

impl Broadcaster {
    pub fn new(transport: Arc<dyn BroadcastTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn transport(&self) -> &Arc<dyn BroadcastTransport> {
        &self.transport
    }

    /// Submits `signed` until it is accepted, a fatal class is seen, or the
    /// policy runs out of attempts.
    ///
    /// Rate limiting and transient failures are retried with linear backoff.
    /// `NonceTooLow` and `Malformed` stop at once. A stale rejection is
    /// checked against the network first: if these exact bytes already
    /// landed, the result is `AlreadyKnown` with the local hash.
    pub async fn submit(&self, signed: &SignedTransaction) -> SendResult<BroadcastOutcome> {
        let chain = self.transport.chain();
        let raw = signed.raw_bytes()?;
        let mut attempt = 1;

        loop {
            metrics::record_broadcast_attempt(chain);
            let response = self.transport.send_raw(&raw).await;
            let class = classify(&response);
            metrics::record_broadcast_outcome(chain, class.as_str());

            match class {
                Classification::Accepted | Classification::AlreadyKnown => {
                    if let TransportResponse::Accepted(remote) = &response {
                        if !remote.eq_ignore_ascii_case(&signed.hash) {
                            tracing::warn!(
                                chain = %chain,
                                local_hash = %signed.hash,
                                remote_hash = %remote,
                                "Endpoint reported a different hash; keeping the local one"
                            );
                        }
                    }
                    let disposition = if class == Classification::Accepted {
                        Disposition::Accepted
                    } else {
                        Disposition::AlreadyKnown
                    };
                    tracing::info!(chain = %chain, hash = %signed.hash, attempt, ?disposition, "Broadcast accepted");
                    return Ok(BroadcastOutcome {
                        hash: signed.hash.clone(),
                        attempts: attempt,
                        disposition,
                    });
                }
                Classification::NonceTooLow => {
                    let message = provider_message(&response);
                    return self.resolve_stale(signed, attempt, message).await;
                }
                Classification::Malformed => {
                    let message = provider_message(&response);
                    tracing::error!(chain = %chain, hash = %signed.hash, error = %message, "Broadcast rejected");
                    return Err(SendError::Broadcast {
                        message,
                        definitive: true,
                    });
                }
                Classification::RateLimited | Classification::TransientNetworkError => {
                    let message = provider_message(&response);
                    if attempt >= self.policy.max_attempts {
                        tracing::warn!(
                            chain = %chain,
                            hash = %signed.hash,
                            attempts = attempt,
                            error = %message,
                            "Broadcast retries exhausted"
                        );
                        return Err(if class == Classification::RateLimited {
                            SendError::RateLimited {
                                attempts: attempt,
                                message,
                            }
                        } else {
                            SendError::Broadcast {
                                message,
                                definitive: false,
                            }
                        });
                    }

                    let delay = self.policy.delay_after(attempt);
                    tracing::debug!(
                        chain = %chain,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        class = class.as_str(),
                        error = %message,
                        "Retrying broadcast"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Broadcaster {
    /// A stale rejection is also what a node answers once the same bytes
    /// were mined, e.g. after a timed-out attempt that did reach the node.
    async fn resolve_stale(
        &self,
        signed: &SignedTransaction,
        attempt: u32,
        message: String,
    ) -> SendResult<BroadcastOutcome> {
        let chain = self.transport.chain();
        match self.transport.lookup(&signed.hash).await {
            Ok(true) => {
                tracing::info!(chain = %chain, hash = %signed.hash, attempt, "Stale rejection for a landed transaction");
                Ok(BroadcastOutcome {
                    hash: signed.hash.clone(),
                    attempts: attempt,
                    disposition: Disposition::AlreadyKnown,
                })
            }
            Ok(false) => {
                tracing::warn!(chain = %chain, hash = %signed.hash, error = %message, "Broadcast rejected as stale");
                Err(SendError::NonceTooLow(message))
            }
            Err(e) => {
                // Unknown outcome; the record must stay open for reconcile.
                tracing::warn!(
                    chain = %chain,
                    hash = %signed.hash,
                    error = %message,
                    lookup_error = %e,
                    "Stale rejection could not be checked"
                );
                Err(SendError::Broadcast {
                    message: format!("{} (lookup failed: {})", message, e),
                    definitive: false,
                })
            }
        }
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("chain", &self.transport.chain())
            .field("policy", &self.policy)
            .finish()
    }
}
