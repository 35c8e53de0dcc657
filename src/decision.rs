use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::model::strategy::Strategy;

// ── Write capability ────────────────────────────────────────────────

/// Capability that commits a strategy change on-chain. The decision
/// layer never interprets the receipt beyond logging it.
#[async_trait]
pub trait StrategyWriter: Send + Sync {
    /// Returns the transaction hash of the submitted update. The gas
    /// limit is resolved by the caller from the chain the funds
    /// currently sit on.
    async fn write(&self, strategy: Strategy, gas_limit: u64) -> Result<String>;
}

// ── Result record ───────────────────────────────────────────────────

/// Outcome of one rebalance decision, kept for observability and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebalanceResult {
    pub current: Strategy,
    pub optimal: Strategy,
    pub updated: bool,
}

// ── Decision ────────────────────────────────────────────────────────

/// Compare the optimizer's choice against the active strategy and write
/// only on structural change.
///
/// No APY-improvement threshold is enforced: any difference triggers a
/// write. A write failure propagates verbatim with no result.
pub async fn decide(
    current: Strategy,
    optimal: Strategy,
    gas_limit: u64,
    writer: &dyn StrategyWriter,
) -> Result<RebalanceResult> {
    if current == optimal {
        println!("  DECISION: strategy unchanged ({current}); no rebalance needed");
        return Ok(RebalanceResult {
            current,
            optimal,
            updated: false,
        });
    }

    let tx_hash = writer
        .write(optimal, gas_limit)
        .await
        .with_context(|| format!("failed to rebalance {current} -> {optimal}"))?;
    println!("  DECISION: rebalanced {current} -> {optimal} (tx: {tx_hash})");

    Ok(RebalanceResult {
        current,
        optimal,
        updated: true,
    })
}
