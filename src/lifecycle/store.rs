//! Persistence contract and the guard every store applies.

use async_trait::async_trait;

use crate::error::{SendError, SendResult};
use crate::lifecycle::record::{SendTransactionRecord, TxStatus};

/// Key-value persistence for send records.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn get(&self, id: &str) -> SendResult<Option<SendTransactionRecord>>;

    /// Insert or replace, subject to [`check_update`].
    async fn save(&self, record: &SendTransactionRecord) -> SendResult<()>;

    /// Records of one wallet, oldest first.
    async fn list_for_wallet(&self, wallet_id: &str) -> SendResult<Vec<SendTransactionRecord>>;
}

/// Validates replacing `existing` with `next`.
///
/// New records must start in `BUILDING`. Existing records may only follow
/// [`TxStatus::can_transition_to`], never change money or identity fields,
/// and must carry signed bytes once past `BUILDING`.
pub fn check_update(existing: Option<&SendTransactionRecord>, next: &SendTransactionRecord) -> SendResult<()> {
    match existing {
        None if next.status != TxStatus::Building => {
            return Err(SendError::InvalidTransition {
                id: next.id.clone(),
                from: "NEW".to_string(),
                to: next.status.to_string(),
            });
        }
        None => {}
        Some(current) => {
            if !current.status.can_transition_to(next.status) {
                return Err(SendError::InvalidTransition {
                    id: next.id.clone(),
                    from: current.status.to_string(),
                    to: next.status.to_string(),
                });
            }
            if !current.same_terms(next) {
                return Err(SendError::Storage(format!(
                    "record {}: amount, fee and addresses are immutable",
                    next.id
                )));
            }
        }
    }

    if next.status != TxStatus::Building && next.signed_transaction().is_none() {
        return Err(SendError::Storage(format!(
            "record {}: {} requires signed bytes and hash",
            next.id, next.status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::record::fixtures;
    use alloy::primitives::U256;

    #[test]
    fn test_new_record_must_be_building() {
        let record = fixtures::record("a", "w");
        assert!(check_update(None, &record).is_ok());

        let signed = fixtures::signed(&record);
        assert!(matches!(
            check_update(None, &signed),
            Err(SendError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_money_fields_are_immutable() {
        let record = fixtures::record("a", "w");
        let mut changed = fixtures::signed(&record);
        changed.fee = U256::from(10_000u64);
        assert!(matches!(check_update(Some(&record), &changed), Err(SendError::Storage(_))));
        assert!(check_update(Some(&record), &fixtures::signed(&record)).is_ok());
    }

    #[test]
    fn test_terminal_record_is_never_overwritten() {
        let record = fixtures::record("a", "w");
        let done = fixtures::signed(&record).with_status(TxStatus::Success);
        let again = done.with_status(TxStatus::Failed);
        assert!(matches!(
            check_update(Some(&done), &again),
            Err(SendError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_signed_status_requires_bytes() {
        let record = fixtures::record("a", "w");
        let bare = record.with_status(TxStatus::Signed);
        assert!(matches!(check_update(Some(&record), &bare), Err(SendError::Storage(_))));
    }
}
