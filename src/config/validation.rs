//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (wallets reference configured chains)
//! - Validate value ranges (attempts > 0, URLs parse, fallback tiers ordered)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::fmt;

use crate::chain::{validate_address, Chain, ChainFamily};
use crate::config::schema::EngineConfig;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if let Err(e) = url::Url::parse(value) {
        errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e)));
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.broadcast.max_attempts == 0 {
        errors.push(ValidationError::new("broadcast.max_attempts", "must be at least 1"));
    }

    let bitcoin = &config.bitcoin;
    if bitcoin.enabled {
        if bitcoin.chain.family() != ChainFamily::Utxo {
            errors.push(ValidationError::new("bitcoin.chain", "must be a UTXO chain"));
        }
        check_url(&mut errors, "bitcoin.esplora_url", &bitcoin.esplora_url);
        if bitcoin.avg_tx_size_bytes == 0 {
            errors.push(ValidationError::new("bitcoin.avg_tx_size_bytes", "must be positive"));
        }
        if bitcoin.parent_fetch_attempts == 0 {
            errors.push(ValidationError::new("bitcoin.parent_fetch_attempts", "must be at least 1"));
        }
        if !bitcoin.fallback_sat_per_byte.is_monotonic() {
            errors.push(ValidationError::new(
                "bitcoin.fallback_sat_per_byte",
                "slow <= normal <= fast is required",
            ));
        }
        let targets = &bitcoin.confirmation_targets;
        if !(targets.fast <= targets.normal && targets.normal <= targets.slow) {
            errors.push(ValidationError::new(
                "bitcoin.confirmation_targets",
                "fast <= normal <= slow blocks is required",
            ));
        }
    }

    let mut seen_chains = HashSet::new();
    let mut seen_ids = HashSet::new();
    for (i, evm) in config.evm.iter().enumerate() {
        let prefix = format!("evm[{}]", i);
        if evm.chain.family() != ChainFamily::Account {
            errors.push(ValidationError::new(format!("{}.chain", prefix), "must be an EVM chain"));
        }
        if !seen_chains.insert(evm.chain) {
            errors.push(ValidationError::new(format!("{}.chain", prefix), "configured twice"));
        }
        if evm.chain_id == 0 || !seen_ids.insert(evm.chain_id) {
            errors.push(ValidationError::new(
                format!("{}.chain_id", prefix),
                "must be non-zero and unique",
            ));
        }
        check_url(&mut errors, &format!("{}.rpc_url", prefix), &evm.rpc_url);
        for url in &evm.failover_urls {
            check_url(&mut errors, &format!("{}.failover_urls", prefix), url);
        }
        if let Some(oracle) = &evm.gas_oracle_url {
            check_url(&mut errors, &format!("{}.gas_oracle_url", prefix), oracle);
        }
        if evm.gas_limit < 21_000 {
            errors.push(ValidationError::new(
                format!("{}.gas_limit", prefix),
                "must cover an intrinsic transfer (21000)",
            ));
        }
        if !evm.fallback_gwei.is_monotonic() {
            errors.push(ValidationError::new(
                format!("{}.fallback_gwei", prefix),
                "slow <= normal <= fast is required",
            ));
        }
    }

    if config.solana.enabled {
        check_url(&mut errors, "solana.rpc_url", &config.solana.rpc_url);
    }

    let mut wallet_ids = HashSet::new();
    for (i, wallet) in config.wallets.iter().enumerate() {
        let prefix = format!("wallets[{}]", i);
        if !wallet_ids.insert(wallet.id.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.id", prefix),
                format!("duplicate wallet id '{}'", wallet.id),
            ));
        }
        if !config.is_configured(wallet.chain) {
            errors.push(ValidationError::new(
                format!("{}.chain", prefix),
                format!("chain {} is not configured", wallet.chain),
            ));
        }
        if let Err(e) = validate_address(wallet.chain, &wallet.address) {
            errors.push(ValidationError::new(format!("{}.address", prefix), e.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Chains with services in this configuration.
pub fn configured_chains(config: &EngineConfig) -> Vec<Chain> {
    Chain::ALL
        .into_iter()
        .filter(|chain| config.is_configured(*chain))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{EvmChainConfig, WalletConfig};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_all_errors_are_reported() {
        let mut config = EngineConfig::default();
        config.broadcast.max_attempts = 0;
        config.evm.push(EvmChainConfig {
            rpc_url: "not a url".to_string(),
            ..EvmChainConfig::default()
        });
        config.evm.push(EvmChainConfig::default());
        config.wallets.push(WalletConfig {
            id: "w".to_string(),
            chain: Chain::Solana,
            address: "nope".to_string(),
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"broadcast.max_attempts"));
        assert!(fields.contains(&"evm[0].rpc_url"));
        assert!(fields.contains(&"evm[1].chain"));
        assert!(fields.contains(&"evm[1].chain_id"));
        assert!(fields.contains(&"wallets[0].chain"));
        assert!(fields.contains(&"wallets[0].address"));
    }

    #[test]
    fn test_configured_chains() {
        let mut config = EngineConfig::default();
        config.solana.enabled = true;
        config.evm.push(EvmChainConfig::default());
        assert_eq!(configured_chains(&config), vec![Chain::Ethereum, Chain::Solana]);
    }
}
