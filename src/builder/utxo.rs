//! UTXO build strategy.

use alloy::primitives::U256;

use crate::builder::transaction::{TxOutput, UnsignedTransaction};
use crate::builder::{BuildRequest, BuildStrategy};
use crate::chain::units::to_u64;
use crate::chain::UtxoAddress;
use crate::error::{SendError, SendResult};
use crate::state::{ChainState, UnspentOutput};

/// First-fit selection over the candidates in provider order.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtxoStrategy;

/// Takes candidates in order until their sum reaches `target`.
///
/// Returns the selected prefix and its total, or `None` if the candidates
/// never reach the target.
pub fn select_first_fit(candidates: &[UnspentOutput], target: u64) -> Option<(Vec<UnspentOutput>, u64)> {
    let mut selected = Vec::new();
    let mut total: u64 = 0;
    for candidate in candidates {
        if total >= target {
            break;
        }
        total = total.checked_add(candidate.value)?;
        selected.push(candidate.clone());
    }
    (total >= target).then_some((selected, total))
}

impl BuildStrategy for UtxoStrategy {
    fn build(&self, request: &BuildRequest, state: &ChainState) -> SendResult<UnsignedTransaction> {
        let chain = request.chain;
        UtxoAddress::parse(chain, &request.to)?;
        if !UtxoAddress::parse(chain, &request.from)?.is_p2pkh() {
            return Err(SendError::invalid_address(
                chain,
                &request.from,
                "source must be a P2PKH address",
            ));
        }

        let ChainState::Utxo { utxos } = state else {
            return Err(SendError::ChainStateUnavailable(format!(
                "expected unspent outputs for {}",
                chain
            )));
        };

        let amount = to_u64(request.amount, "amount")?;
        let fee = to_u64(request.fee.total_fee, "fee")?;
        let target = amount
            .checked_add(fee)
            .ok_or_else(|| SendError::InvalidAmount("amount plus fee overflows".to_string()))?;

        let Some((inputs, selected_total)) = select_first_fit(utxos, target) else {
            return Err(SendError::InsufficientFunds {
                required: U256::from(target),
                available: state.spendable(),
            });
        };

        let mut outputs = vec![TxOutput {
            address: request.to.clone(),
            value: amount,
        }];
        let change = selected_total - target;
        let change_address = if change > 0 {
            outputs.push(TxOutput {
                address: request.from.clone(),
                value: change,
            });
            Some(request.from.clone())
        } else {
            None
        };

        tracing::debug!(
            chain = %chain,
            inputs = inputs.len(),
            selected_total,
            change,
            "Built UTXO transaction"
        );

        Ok(UnsignedTransaction::Utxo {
            inputs,
            outputs,
            change_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FeeTerms;
    use crate::chain::Chain;

    const FROM: &str = "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH";
    const TO: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    fn candidates(values: &[u64]) -> ChainState {
        ChainState::Utxo {
            utxos: values
                .iter()
                .enumerate()
                .map(|(i, value)| UnspentOutput {
                    txid: format!("{:064x}", i + 1),
                    output_index: 0,
                    value: *value,
                    locking_script: String::new(),
                })
                .collect(),
        }
    }

    fn request(amount: u64, fee: u64) -> BuildRequest {
        BuildRequest {
            chain: Chain::Bitcoin,
            from: FROM.to_string(),
            to: TO.to_string(),
            amount: U256::from(amount),
            fee: FeeTerms::flat(U256::from(fee)),
        }
    }

    #[test]
    fn test_first_fit_with_change() {
        let tx = UtxoStrategy
            .build(&request(6000, 1000), &candidates(&[5000, 3000, 2000]))
            .unwrap();
        let UnsignedTransaction::Utxo {
            inputs,
            outputs,
            change_address,
        } = tx
        else {
            panic!("expected a UTXO transaction");
        };
        assert_eq!(inputs.iter().map(|i| i.value).collect::<Vec<_>>(), vec![5000, 3000]);
        assert_eq!(
            outputs,
            vec![
                TxOutput { address: TO.to_string(), value: 6000 },
                TxOutput { address: FROM.to_string(), value: 1000 },
            ]
        );
        assert_eq!(change_address.as_deref(), Some(FROM));
    }

    #[test]
    fn test_exact_match_has_no_change() {
        let tx = UtxoStrategy.build(&request(6000, 1000), &candidates(&[7000])).unwrap();
        let UnsignedTransaction::Utxo { inputs, outputs, change_address } = tx else {
            panic!("expected a UTXO transaction");
        };
        assert_eq!(inputs.len(), 1);
        assert_eq!(outputs.len(), 1);
        assert!(change_address.is_none());
    }

    #[test]
    fn test_order_is_the_only_tie_break() {
        let tx = UtxoStrategy.build(&request(1000, 100), &candidates(&[2000, 1100])).unwrap();
        let UnsignedTransaction::Utxo { inputs, .. } = tx else {
            panic!("expected a UTXO transaction");
        };
        assert_eq!(inputs[0].value, 2000);
    }

    #[test]
    fn test_insufficient_funds() {
        let err = UtxoStrategy
            .build(&request(6000, 1000), &candidates(&[3000, 2000]))
            .unwrap_err();
        match err {
            SendError::InsufficientFunds { required, available } => {
                assert_eq!(required, U256::from(7000u64));
                assert_eq!(available, U256::from(5000u64));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_destination_fails_first() {
        let mut bad = request(6000, 1000);
        bad.to = "0x52908400098527886E0F7030069857D2E4169EE7".to_string();
        let err = UtxoStrategy.build(&bad, &candidates(&[])).unwrap_err();
        assert!(matches!(err, SendError::InvalidAddress { .. }));
    }

    #[test]
    fn test_source_must_be_p2pkh() {
        let mut bad = request(6000, 1000);
        bad.from = "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy".to_string();
        let err = UtxoStrategy.build(&bad, &candidates(&[7000])).unwrap_err();
        assert!(matches!(err, SendError::InvalidAddress { .. }));
    }
}
