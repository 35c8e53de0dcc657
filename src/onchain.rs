use alloy::primitives::U256;
use alloy::sol;
use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::decision::StrategyWriter;
use crate::evm;
use crate::model::chain::{ChainConfig, find_chain};
use crate::model::strategy::Strategy;
use crate::workflow::RegistryReader;

/// Env var holding the hex private key used for rebalance writes.
pub const PRIVATE_KEY_ENV: &str = "YIELD_REBALANCER_PRIVATE_KEY";

// ── Peer contract interfaces ────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IYieldPeer {
        struct Strategy {
            bytes32 protocolId;
            uint64 chainSelector;
        }

        function getStrategy() external view returns (Strategy memory);
        function getTotalValue() external view returns (uint256 totalValue);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IRebalancer {
        struct Strategy {
            bytes32 protocolId;
            uint64 chainSelector;
        }

        function rebalance(Strategy calldata newStrategy) external;
    }
}

// ── Registry reader ─────────────────────────────────────────────────

/// Reads the active strategy from the parent-chain peer and TVL from
/// whichever chain's peer currently holds the funds.
pub struct EvmRegistryReader {
    parent: ChainConfig,
    chains: Vec<ChainConfig>,
}

impl EvmRegistryReader {
    pub fn new(parent: ChainConfig, chains: Vec<ChainConfig>) -> Self {
        EvmRegistryReader { parent, chains }
    }
}

#[async_trait]
impl RegistryReader for EvmRegistryReader {
    async fn current_strategy(&self) -> Result<Strategy> {
        let peer_addr = self.parent.yield_peer()?;
        let provider = evm::read_provider(&self.parent.rpc_url)?;
        let peer = IYieldPeer::new(peer_addr, &provider);

        let strategy = peer
            .getStrategy()
            .call()
            .await
            .with_context(|| format!("YieldPeer getStrategy on {}", self.parent.name))?;
        Ok(Strategy::new(strategy.protocolId, strategy.chainSelector))
    }

    async fn total_value(&self, chain_selector: u64) -> Result<U256> {
        // Reuse the parent entry when the strategy lives there; any
        // other selector must be a configured child with its own peer.
        let chain = if chain_selector == self.parent.chain_selector {
            &self.parent
        } else {
            find_chain(&self.chains, chain_selector)
                .context("locating the strategy chain's peer")?
        };

        let peer_addr = chain.yield_peer()?;
        let provider = evm::read_provider(&chain.rpc_url)?;
        let peer = IYieldPeer::new(peer_addr, &provider);

        peer.getTotalValue()
            .call()
            .await
            .with_context(|| format!("YieldPeer getTotalValue on {}", chain.name))
    }
}

// ── Strategy writers ────────────────────────────────────────────────

/// Submits the strategy update through the parent-chain rebalancer
/// contract and waits for the receipt. The gas limit comes from the
/// caller, sized for the chain the funds sit on.
pub struct EvmStrategyWriter {
    chain: ChainConfig,
    private_key: String,
}

impl EvmStrategyWriter {
    pub fn from_env(chain: ChainConfig) -> Result<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV)
            .with_context(|| format!("{PRIVATE_KEY_ENV} not set"))?;
        Ok(EvmStrategyWriter { chain, private_key })
    }
}

#[async_trait]
impl StrategyWriter for EvmStrategyWriter {
    async fn write(&self, strategy: Strategy, gas_limit: u64) -> Result<String> {
        let rebalancer_addr = self.chain.rebalancer()?;
        let provider = evm::write_provider(&self.private_key, &self.chain.rpc_url)?;
        let rebalancer = IRebalancer::new(rebalancer_addr, &provider);

        let pending = rebalancer
            .rebalance(IRebalancer::Strategy {
                protocolId: strategy.protocol_id,
                chainSelector: strategy.chain_selector,
            })
            .gas(gas_limit)
            .send()
            .await
            .with_context(|| format!("submitting rebalance on {}", self.chain.name))?;
        let receipt = pending
            .get_receipt()
            .await
            .context("awaiting rebalance receipt")?;
        evm::require_success(&receipt, "rebalance")?;

        Ok(format!("{:#x}", receipt.transaction_hash))
    }
}

/// Writer that only logs; used by `--dry-run`.
pub struct DryRunWriter;

#[async_trait]
impl StrategyWriter for DryRunWriter {
    async fn write(&self, strategy: Strategy, gas_limit: u64) -> Result<String> {
        println!("  DRY-RUN: would rebalance to {strategy} (gas limit {gas_limit})");
        Ok("dry-run".into())
    }
}
