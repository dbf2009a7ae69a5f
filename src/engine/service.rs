//! Application-facing send engine.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::broadcast::{BroadcastOutcome, Disposition};
use crate::builder::{build_transaction, BuildRequest, FeeTerms};
use crate::chain::{to_base_units, to_decimal_string, validate_address, Chain, FeeTier};
use crate::engine::services::ChainServices;
use crate::engine::wallets::{Wallet, WalletDirectory};
use crate::error::{SendError, SendResult};
use crate::fees::FeeEstimate;
use crate::lifecycle::{now_secs, Failure, SendTransactionRecord, TransactionStore, TxStatus};
use crate::observability::metrics;
use crate::signer::{SignedTransaction, Signer};

/// Balance of a wallet in base units and display form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub wallet_id: String,
    pub chain: Chain,
    pub address: String,
    pub base_units: U256,
    pub decimal: String,
}

/// Builds, signs and broadcasts sends, persisting every step.
///
/// The engine keeps no per-send state of its own. Calls for different
/// record ids may run concurrently; calls for the same id must be
/// serialized by the caller.
#[derive(Clone)]
pub struct SendEngine {
    services: Arc<HashMap<Chain, ChainServices>>,
    signer: Signer,
    store: Arc<dyn TransactionStore>,
    wallets: Arc<dyn WalletDirectory>,
}

impl SendEngine {
    pub fn new(
        services: HashMap<Chain, ChainServices>,
        signer: Signer,
        store: Arc<dyn TransactionStore>,
        wallets: Arc<dyn WalletDirectory>,
    ) -> Self {
        Self {
            services: Arc::new(services),
            signer,
            store,
            wallets,
        }
    }

    pub fn chains(&self) -> Vec<Chain> {
        let mut chains: Vec<_> = self.services.keys().copied().collect();
        chains.sort();
        chains
    }

    fn services(&self, chain: Chain) -> SendResult<&ChainServices> {
        self.services.get(&chain).ok_or(SendError::UnsupportedChain(chain))
    }

    async fn load(&self, id: &str) -> SendResult<SendTransactionRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| SendError::NotFound(format!("transaction '{}'", id)))
    }

    async fn persist(&self, previous: Option<TxStatus>, record: &SendTransactionRecord) -> SendResult<()> {
        self.store.save(record).await?;
        if previous != Some(record.status) {
            metrics::record_transition(record.chain, record.status.as_str());
            tracing::info!(
                tx_id = %record.id,
                chain = %record.chain,
                from = previous.map(TxStatus::as_str).unwrap_or("NEW"),
                to = %record.status,
                "Send status changed"
            );
        }
        Ok(())
    }

    /// Keeps the status, records why the last step failed.
    async fn note_failure(&self, record: &SendTransactionRecord, error: &SendError) {
        let next = SendTransactionRecord {
            failure: Some(Failure::from(error)),
            ..record.with_status(record.status)
        };
        if let Err(e) = self.store.save(&next).await {
            tracing::warn!(tx_id = %record.id, error = %e, "Failed to record failure");
        }
    }

    /// Fee estimates for every tier on the wallet's chain, slow to fast.
    pub async fn estimate_fees(&self, wallet_id: &str) -> SendResult<Vec<FeeEstimate>> {
        let wallet = self.wallets.resolve(wallet_id).await?;
        Ok(self.services(wallet.chain)?.estimator.estimate_all().await)
    }

    pub async fn balance(&self, wallet_id: &str) -> SendResult<Balance> {
        let wallet = self.wallets.resolve(wallet_id).await?;
        let base_units = self.services(wallet.chain)?.reader.balance(&wallet.address).await?;
        Ok(Balance {
            decimal: to_decimal_string(base_units, wallet.chain.decimals()),
            wallet_id: wallet.id,
            chain: wallet.chain,
            address: wallet.address,
            base_units,
        })
    }

    /// Builds a transaction for `amount` (decimal, display units) and
    /// persists it as `BUILDING`. Amount and fee are fixed from here on.
    pub async fn create_send(
        &self,
        wallet_id: &str,
        to_address: &str,
        amount: &str,
        tier: FeeTier,
    ) -> SendResult<SendTransactionRecord> {
        let wallet = self.wallets.resolve(wallet_id).await?;
        let chain = wallet.chain;
        let services = self.services(chain)?;

        let amount = to_base_units(amount, chain.decimals())?;
        if amount.is_zero() {
            return Err(SendError::InvalidAmount("amount must be greater than zero".to_string()));
        }
        validate_address(chain, to_address)?;

        let estimate = services.estimator.estimate(tier).await;
        let state = services.reader.snapshot(&wallet.address).await?;
        let request = BuildRequest {
            chain,
            from: wallet.address.clone(),
            to: to_address.to_string(),
            amount,
            fee: FeeTerms::from_estimate(&estimate),
        };
        let unsigned = build_transaction(&request, &state)?;

        let now = now_secs();
        let record = SendTransactionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            wallet_id: wallet.id.clone(),
            chain,
            from_address: wallet.address,
            to_address: to_address.to_string(),
            amount,
            amount_decimal: to_decimal_string(amount, chain.decimals()),
            fee: estimate.total_fee,
            fee_decimal: estimate.total_fee_decimal.clone(),
            fee_tier: tier,
            status: TxStatus::Building,
            nonce_or_blockhash: unsigned.nonce_or_blockhash(),
            unsigned,
            signed_hex: None,
            hash: None,
            failure: None,
            created_at: now,
            updated_at: now,
        };
        self.persist(None, &record).await?;

        tracing::info!(
            tx_id = %record.id,
            wallet_id = %record.wallet_id,
            chain = %chain,
            amount = %record.amount_decimal,
            fee = %record.fee_decimal,
            tier = tier.as_str(),
            fee_source = estimate.source(),
            "Send created"
        );
        Ok(record)
    }

    /// Rebuilds a `BUILDING` record against fresh chain state, keeping its
    /// amount and fee.
    pub async fn rebuild(&self, id: &str) -> SendResult<SendTransactionRecord> {
        let record = self.load(id).await?;
        if record.status != TxStatus::Building {
            return Err(SendError::InvalidTransition {
                id: record.id,
                from: record.status.to_string(),
                to: TxStatus::Building.to_string(),
            });
        }
        let services = self.services(record.chain)?;

        let state = services.reader.snapshot(&record.from_address).await?;
        let request = BuildRequest {
            chain: record.chain,
            from: record.from_address.clone(),
            to: record.to_address.clone(),
            amount: record.amount,
            fee: FeeTerms::from_unsigned(record.fee, &record.unsigned),
        };
        let unsigned = build_transaction(&request, &state)?;

        let next = SendTransactionRecord {
            nonce_or_blockhash: unsigned.nonce_or_blockhash(),
            unsigned,
            failure: None,
            ..record.with_status(TxStatus::Building)
        };
        self.persist(Some(record.status), &next).await?;
        tracing::info!(tx_id = %next.id, reference = %next.nonce_or_blockhash, "Send rebuilt");
        Ok(next)
    }

    /// Signs a `BUILDING` record and persists it as `SIGNED`.
    ///
    /// Chain state is re-read first; a transaction built against state that
    /// has moved on fails with `StaleTransaction` and must be rebuilt.
    /// Signing an already signed record returns the stored signature.
    pub async fn sign(&self, id: &str) -> SendResult<SignedTransaction> {
        let record = self.load(id).await?;
        if record.status == TxStatus::Signed {
            if let Some(signed) = record.signed_transaction() {
                return Ok(signed);
            }
        }
        if record.status != TxStatus::Building {
            return Err(SendError::InvalidTransition {
                id: record.id,
                from: record.status.to_string(),
                to: TxStatus::Signed.to_string(),
            });
        }
        let services = self.services(record.chain)?;

        if !services.reader.is_current(&record.from_address, &record.unsigned).await? {
            let error = SendError::StaleTransaction(format!(
                "chain state moved past {}; rebuild before signing",
                record.nonce_or_blockhash
            ));
            tracing::warn!(tx_id = %record.id, chain = %record.chain, "Unsigned transaction is stale");
            self.note_failure(&record, &error).await;
            return Err(error);
        }

        let signed = match self.signer.sign(&record, &record.unsigned).await {
            Ok(signed) => signed,
            Err(error) => {
                self.note_failure(&record, &error).await;
                return Err(error);
            }
        };

        let next = SendTransactionRecord {
            signed_hex: Some(signed.raw_hex.clone()),
            hash: Some(signed.hash.clone()),
            failure: None,
            ..record.with_status(TxStatus::Signed)
        };
        self.persist(Some(record.status), &next).await?;
        Ok(signed)
    }

    /// For a `BROADCASTING` record, asks the network whether its hash
    /// landed and marks it `SUCCESS` if so. Other records are returned as is.
    pub async fn reconcile(&self, id: &str) -> SendResult<SendTransactionRecord> {
        let record = self.load(id).await?;
        if record.status != TxStatus::Broadcasting {
            return Ok(record);
        }
        let Some(hash) = record.hash.clone() else {
            return Ok(record);
        };

        let found = self
            .services(record.chain)?
            .broadcaster
            .transport()
            .lookup(&hash)
            .await?;
        if !found {
            tracing::debug!(tx_id = %record.id, hash = %hash, "Broadcast not yet visible");
            return Ok(record);
        }

        let next = SendTransactionRecord {
            failure: None,
            ..record.with_status(TxStatus::Success)
        };
        self.persist(Some(record.status), &next).await?;
        Ok(next)
    }

    /// Submits a `SIGNED` record, or re-submits a `BROADCASTING` one after
    /// checking whether the earlier submission already landed.
    ///
    /// `NonceTooLow` for bytes that are not on chain and definitive
    /// rejections mark the record `FAILED`. Exhausted retries leave it
    /// `BROADCASTING`.
    pub async fn broadcast(&self, id: &str) -> SendResult<BroadcastOutcome> {
        let mut record = self.load(id).await?;

        if record.status == TxStatus::Broadcasting {
            record = self.reconcile(id).await?;
        }
        match record.status {
            TxStatus::Success => {
                let hash = record.hash.clone().unwrap_or_default();
                return Ok(BroadcastOutcome {
                    hash,
                    attempts: 0,
                    disposition: Disposition::AlreadyKnown,
                });
            }
            TxStatus::Signed | TxStatus::Broadcasting => {}
            status => {
                return Err(SendError::InvalidTransition {
                    id: record.id,
                    from: status.to_string(),
                    to: TxStatus::Broadcasting.to_string(),
                });
            }
        }

        let signed = record
            .signed_transaction()
            .ok_or_else(|| SendError::Storage(format!("record {} has no signed bytes", record.id)))?;
        let services = self.services(record.chain)?;

        if record.status == TxStatus::Signed {
            let next = record.with_status(TxStatus::Broadcasting);
            self.persist(Some(record.status), &next).await?;
            record = next;
        }

        match services.broadcaster.submit(&signed).await {
            Ok(outcome) => {
                let next = SendTransactionRecord {
                    failure: None,
                    ..record.with_status(TxStatus::Success)
                };
                if let Err(e) = self.persist(Some(record.status), &next).await {
                    tracing::error!(tx_id = %record.id, hash = %outcome.hash, error = %e, "Broadcast accepted but not persisted");
                    return Err(e);
                }
                Ok(outcome)
            }
            Err(error) => {
                let definitive = matches!(
                    error,
                    SendError::NonceTooLow(_) | SendError::Broadcast { definitive: true, .. }
                );
                let status = if definitive {
                    TxStatus::Failed
                } else {
                    TxStatus::Broadcasting
                };
                let next = SendTransactionRecord {
                    failure: Some(Failure::from(&error)),
                    ..record.with_status(status)
                };
                self.persist(Some(record.status), &next).await?;
                Err(error)
            }
        }
    }

    pub async fn record(&self, id: &str) -> SendResult<SendTransactionRecord> {
        self.load(id).await
    }

    pub async fn records_for_wallet(&self, wallet_id: &str) -> SendResult<Vec<SendTransactionRecord>> {
        self.store.list_for_wallet(wallet_id).await
    }

    pub async fn wallet(&self, wallet_id: &str) -> SendResult<Wallet> {
        self.wallets.resolve(wallet_id).await
    }
}

impl std::fmt::Debug for SendEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendEngine")
            .field("chains", &self.chains())
            .finish_non_exhaustive()
    }
}
