pub mod aave_v3;
pub mod compound_v3;

use std::sync::Arc;

use alloy::primitives::{B256, U256};
use anyhow::Result;
use async_trait::async_trait;

use crate::model::chain::ChainConfig;

// ── Protocol adapter seam ────────────────────────────────────────────

/// One lending protocol family's APY oracle.
///
/// `get_apy` resolves the protocol's contracts on the requested chain,
/// gathers the rate-formula inputs at a single pinned block, and returns
/// the supply-side APY as a decimal fraction (0.0523 = 5.23%) — as if
/// `deposit` raw stablecoin units were added to the pool (`U256::ZERO`
/// for the undisturbed current yield).
///
/// Failures (chain not configured, address missing, read errors,
/// out-of-range rates) propagate with context; nothing is retried here.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// keccak256 id this adapter answers for.
    fn protocol_id(&self) -> B256;

    fn name(&self) -> &'static str;

    async fn get_apy(
        &self,
        chains: &[ChainConfig],
        chain_selector: u64,
        deposit: U256,
    ) -> Result<f64>;
}

// ── Adapter registry ─────────────────────────────────────────────────

/// Immutable protocol-id → adapter lookup, built once per run and
/// passed explicitly wherever APYs are computed.
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn ProtocolAdapter>>,
}

impl AdapterRegistry {
    pub fn new(adapters: Vec<Arc<dyn ProtocolAdapter>>) -> Self {
        AdapterRegistry { adapters }
    }

    /// The real on-chain adapters for every supported protocol family.
    pub fn evm_defaults() -> Self {
        AdapterRegistry::new(vec![
            Arc::new(aave_v3::AaveV3Adapter),
            Arc::new(compound_v3::CompoundV3Adapter),
        ])
    }

    pub fn get(&self, protocol_id: B256) -> Option<Arc<dyn ProtocolAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.protocol_id() == protocol_id)
            .cloned()
    }
}
