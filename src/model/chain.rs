use alloy::primitives::Address;
use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One chain entry from the config file.
///
/// A protocol is considered deployed on this chain iff its address field
/// is present; absent addresses exclude the (protocol, chain) pair from
/// the candidate set rather than erroring.
///
/// ```json
/// {
///   "name": "base",
///   "chain_selector": 15971525489660198786,
///   "rpc_url": "https://mainnet.base.org",
///   "usdc_address": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
///   "aave_v3_pool_addresses_provider": "0xe20fCBdBfFC4Dd138cE8b2E6FBb6CB49777ad64D",
///   "gas_limit": 500000
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChainConfig {
    /// Human-readable chain name (e.g. "ethereum", "base").
    pub name: String,
    /// CCIP-style chain selector used in strategy identities.
    pub chain_selector: u64,
    /// JSON-RPC endpoint for all reads and writes on this chain.
    pub rpc_url: String,
    /// Yield peer contract holding the pooled liquidity on this chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yield_peer_address: Option<String>,
    /// Rebalancer contract (parent chain only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebalancer_address: Option<String>,
    /// Gas limit for the rebalance write.
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Stablecoin (USDC) token address on this chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usdc_address: Option<String>,
    /// Aave V3 PoolAddressesProvider; the data provider and rate
    /// strategy contracts are discovered from it at runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aave_v3_pool_addresses_provider: Option<String>,
    /// Compound V3 Comet market for the stablecoin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound_v3_comet: Option<String>,
}

fn default_gas_limit() -> u64 {
    500_000
}

#[derive(Debug, Error)]
#[error("no chain config found for chain selector {0}")]
pub struct ChainNotFound(pub u64);

/// Look up a chain entry by selector.
pub fn find_chain(chains: &[ChainConfig], selector: u64) -> Result<&ChainConfig, ChainNotFound> {
    chains
        .iter()
        .find(|c| c.chain_selector == selector)
        .ok_or(ChainNotFound(selector))
}

impl ChainConfig {
    /// Parse the stablecoin address, erroring if unconfigured or invalid.
    pub fn usdc(&self) -> Result<Address> {
        parse_address(self.usdc_address.as_deref(), "usdc_address", &self.name)
    }

    /// Parse the Aave addresses-provider address.
    pub fn aave_addresses_provider(&self) -> Result<Address> {
        parse_address(
            self.aave_v3_pool_addresses_provider.as_deref(),
            "aave_v3_pool_addresses_provider",
            &self.name,
        )
    }

    /// Parse the yield peer address.
    pub fn yield_peer(&self) -> Result<Address> {
        parse_address(
            self.yield_peer_address.as_deref(),
            "yield_peer_address",
            &self.name,
        )
    }

    /// Parse the rebalancer address.
    pub fn rebalancer(&self) -> Result<Address> {
        parse_address(
            self.rebalancer_address.as_deref(),
            "rebalancer_address",
            &self.name,
        )
    }

    /// Parse the Compound Comet address.
    pub fn comet(&self) -> Result<Address> {
        parse_address(
            self.compound_v3_comet.as_deref(),
            "compound_v3_comet",
            &self.name,
        )
    }
}

fn parse_address(raw: Option<&str>, field: &str, chain: &str) -> Result<Address> {
    let raw = raw.with_context(|| format!("{field} not configured for chain {chain}"))?;
    raw.parse::<Address>()
        .with_context(|| format!("invalid {field} '{raw}' for chain {chain}"))
}
