use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::chain::ChainConfig;

// ── Config file ─────────────────────────────────────────────────────

/// Top-level config file, JSON on disk. `schema` dumps the generated
/// JSON schema for editor tooling.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Rebalance cadence for the run loop: "30s", "5m", "1h" forms.
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Fixed simulated deposit in raw stablecoin units. When absent the
    /// pool's live total value is read from the registry instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<String>,
    pub chains: Vec<ChainConfig>,
}

fn default_schedule() -> String {
    "5m".into()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Parent chain: the first entry carrying a yield peer address. The
    /// registry and rebalancer both live there.
    pub fn parent(&self) -> Result<&ChainConfig> {
        self.chains
            .iter()
            .find(|c| c.yield_peer_address.is_some())
            .context("no chain in config has a yield_peer_address")
    }

    pub fn schedule_interval(&self) -> Result<Duration> {
        parse_schedule(&self.schedule)
    }

    /// Fixed deposit override, decimal string in raw units.
    pub fn deposit(&self) -> Result<Option<U256>> {
        match &self.deposit_amount {
            None => Ok(None),
            Some(raw) => {
                let amount = U256::from_str_radix(raw, 10)
                    .with_context(|| format!("invalid deposit_amount '{raw}'"))?;
                Ok(Some(amount))
            }
        }
    }
}

fn parse_schedule(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if raw.len() < 2 {
        bail!("invalid schedule '{raw}', expected forms like 30s, 5m, 1h");
    }
    let (value, unit) = raw.split_at(raw.len() - 1);
    let value: u64 = value
        .parse()
        .with_context(|| format!("invalid schedule '{raw}'"))?;
    if value == 0 {
        bail!("schedule interval must be positive, got '{raw}'");
    }
    let secs = match unit {
        "s" => value,
        "m" => value * 60,
        "h" => value * 3600,
        _ => bail!("invalid schedule unit in '{raw}', expected s, m or h"),
    };
    Ok(Duration::from_secs(secs))
}

// ── Validation ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config has no chains")]
    NoChains,

    #[error("duplicate chain selector {0}")]
    DuplicateSelector(u64),

    #[error("chain {chain}: invalid {field} '{value}'")]
    BadAddress {
        chain: String,
        field: &'static str,
        value: String,
    },

    #[error("chain {0}: gas_limit must be positive")]
    ZeroGasLimit(String),

    #[error("no chain has a yield_peer_address; a parent chain is required")]
    NoParentChain,

    #[error("no chain carries any protocol address; nothing to optimize")]
    NoProtocols,

    #[error("{0}")]
    BadSchedule(String),

    #[error("{0}")]
    BadDeposit(String),
}

impl Config {
    /// Collects every problem rather than stopping at the first, so one
    /// `validate` invocation reports the whole config.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if self.chains.is_empty() {
            errors.push(ConfigError::NoChains);
        }

        let mut seen = HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.chain_selector) {
                errors.push(ConfigError::DuplicateSelector(chain.chain_selector));
            }
            if chain.gas_limit == 0 {
                errors.push(ConfigError::ZeroGasLimit(chain.name.clone()));
            }
            let addresses: [(&'static str, &Option<String>); 5] = [
                ("yield_peer_address", &chain.yield_peer_address),
                ("rebalancer_address", &chain.rebalancer_address),
                ("usdc_address", &chain.usdc_address),
                (
                    "aave_v3_pool_addresses_provider",
                    &chain.aave_v3_pool_addresses_provider,
                ),
                ("compound_v3_comet", &chain.compound_v3_comet),
            ];
            for (field, value) in addresses {
                if let Some(value) = value {
                    if value.parse::<Address>().is_err() {
                        errors.push(ConfigError::BadAddress {
                            chain: chain.name.clone(),
                            field,
                            value: value.clone(),
                        });
                    }
                }
            }
        }

        if !self.chains.is_empty() {
            if !self.chains.iter().any(|c| c.yield_peer_address.is_some()) {
                errors.push(ConfigError::NoParentChain);
            }
            if !self.chains.iter().any(|c| {
                c.aave_v3_pool_addresses_provider.is_some() || c.compound_v3_comet.is_some()
            }) {
                errors.push(ConfigError::NoProtocols);
            }
        }

        if let Err(e) = parse_schedule(&self.schedule) {
            errors.push(ConfigError::BadSchedule(e.to_string()));
        }
        if let Err(e) = self.deposit() {
            errors.push(ConfigError::BadDeposit(format!("{e:#}")));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(name: &str, selector: u64) -> ChainConfig {
        ChainConfig {
            name: name.into(),
            chain_selector: selector,
            rpc_url: "http://localhost:8545".into(),
            yield_peer_address: None,
            rebalancer_address: None,
            gas_limit: 500_000,
            usdc_address: None,
            aave_v3_pool_addresses_provider: None,
            compound_v3_comet: None,
        }
    }

    fn config(chains: Vec<ChainConfig>) -> Config {
        Config {
            schedule: "5m".into(),
            deposit_amount: None,
            chains,
        }
    }

    #[test]
    fn schedule_forms_parse() {
        assert_eq!(parse_schedule("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_schedule("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_schedule("1h").unwrap(), Duration::from_secs(3600));
        assert!(parse_schedule("").is_err());
        assert!(parse_schedule("5").is_err());
        assert!(parse_schedule("0s").is_err());
        assert!(parse_schedule("5d").is_err());
        assert!(parse_schedule("-1m").is_err());
    }

    #[test]
    fn deposit_parses_decimal_raw_units() {
        let mut cfg = config(vec![]);
        assert_eq!(cfg.deposit().unwrap(), None);
        cfg.deposit_amount = Some("1000000000".into());
        assert_eq!(cfg.deposit().unwrap(), Some(U256::from(1_000_000_000u64)));
        cfg.deposit_amount = Some("1e9".into());
        assert!(cfg.deposit().is_err());
    }

    #[test]
    fn validate_collects_every_problem() {
        let mut a = chain("a", 1);
        a.gas_limit = 0;
        a.usdc_address = Some("nonsense".into());
        let b = chain("b", 1);
        let mut cfg = config(vec![a, b]);
        cfg.schedule = "soon".into();

        let errors = cfg.validate().unwrap_err();
        let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert!(rendered.iter().any(|e| e.contains("duplicate chain selector 1")));
        assert!(rendered.iter().any(|e| e.contains("gas_limit must be positive")));
        assert!(rendered.iter().any(|e| e.contains("invalid usdc_address")));
        assert!(rendered.iter().any(|e| e.contains("yield_peer_address")));
        assert!(rendered.iter().any(|e| e.contains("nothing to optimize")));
        assert!(rendered.iter().any(|e| e.contains("schedule")));
    }

    #[test]
    fn parent_is_first_chain_with_peer() {
        let mut a = chain("a", 1);
        let mut b = chain("b", 2);
        b.yield_peer_address = Some("0x1111111111111111111111111111111111111111".into());
        a.aave_v3_pool_addresses_provider =
            Some("0x2222222222222222222222222222222222222222".into());
        let cfg = config(vec![a, b]);
        assert_eq!(cfg.parent().unwrap().name, "b");
        assert!(cfg.validate().is_ok());
    }
}
