use std::sync::Arc;

use alloy::primitives::U256;
use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::Config;
use crate::decision::{self, RebalanceResult, StrategyWriter};
use crate::model::chain::find_chain;
use crate::model::strategy::Strategy;
use crate::offchain::{AllowList, FeedTransport, pool_to_strategy, select_best_pool};
use crate::optimizer::{Optimizer, build_candidates};
use crate::protocols::AdapterRegistry;

// ── Registry capability ─────────────────────────────────────────────

/// Read access to the deployed peers: the active strategy (parent
/// chain) and the pool's total value on a given chain.
#[async_trait]
pub trait RegistryReader: Send + Sync {
    async fn current_strategy(&self) -> Result<Strategy>;

    /// TVL as reported by the yield peer on `chain_selector`. The funds
    /// sit on the active strategy's chain, not necessarily the parent.
    async fn total_value(&self, chain_selector: u64) -> Result<U256>;
}

// ── Dependency wiring ───────────────────────────────────────────────

/// Everything one rebalance run needs, injected explicitly so tests can
/// substitute any piece.
pub struct WorkflowDeps {
    pub registry: Arc<dyn RegistryReader>,
    pub writer: Arc<dyn StrategyWriter>,
    pub adapters: AdapterRegistry,
}

// ── Runs ────────────────────────────────────────────────────────────

/// One on-chain rebalance pass: read the active strategy, size the
/// simulated deposit from the chain it lives on, evaluate every
/// candidate, commit on change.
pub async fn run_once(config: &Config, deps: &WorkflowDeps) -> Result<RebalanceResult> {
    println!("REBALANCE: reading current strategy");
    let current = deps
        .registry
        .current_strategy()
        .await
        .context("reading current strategy from registry")?;
    println!("  REBALANCE: current strategy {current}");

    // The rebalance write is sized for the chain the funds sit on.
    let strategy_chain = find_chain(&config.chains, current.chain_selector)
        .context("locating the current strategy's chain")?;
    let gas_limit = strategy_chain.gas_limit;

    // A fixed deposit_amount in the config overrides the live TVL read.
    let deposit = match config.deposit()? {
        Some(amount) => amount,
        None => deps
            .registry
            .total_value(current.chain_selector)
            .await
            .with_context(|| {
                format!("reading total value from the {} peer", strategy_chain.name)
            })?,
    };
    println!("  REBALANCE: simulated deposit {deposit}");

    let candidates = build_candidates(&config.chains);
    let optimizer = Optimizer::new(deps.adapters.clone());
    let best = optimizer
        .optimize(&config.chains, &candidates, current, deposit)
        .await?;
    println!(
        "  REBALANCE: optimal strategy {} APY {:.4}%",
        best.strategy,
        best.apy * 100.0
    );

    decision::decide(current, best.strategy, gas_limit, deps.writer.as_ref()).await
}

/// Off-chain variant: pick the best approved pool from the public yield
/// feed instead of reading rates from the protocols directly.
pub async fn run_once_offchain(
    config: &Config,
    registry: &dyn RegistryReader,
    writer: &dyn StrategyWriter,
    transport: &dyn FeedTransport,
) -> Result<RebalanceResult> {
    println!("REBALANCE: reading current strategy");
    let current = registry
        .current_strategy()
        .await
        .context("reading current strategy from registry")?;
    println!("  REBALANCE: current strategy {current}");

    let strategy_chain = find_chain(&config.chains, current.chain_selector)
        .context("locating the current strategy's chain")?;
    let gas_limit = strategy_chain.gas_limit;

    let pool = select_best_pool(transport, &AllowList::defaults()).await?;
    println!(
        "  REBALANCE: best feed pool {} {} on {} APY {:.4}%",
        pool.project,
        pool.symbol,
        pool.chain,
        pool.apy.unwrap_or(0.0)
    );

    let optimal = pool_to_strategy(&pool)?;
    decision::decide(current, optimal, gas_limit, writer).await
}
