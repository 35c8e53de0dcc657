use alloy::primitives::U256;
use futures::future;
use thiserror::Error;

use crate::model::chain::ChainConfig;
use crate::model::strategy::{Strategy, StrategyWithApy};
use crate::protocols::AdapterRegistry;

// ── Candidate enumeration ───────────────────────────────────────────

/// Cross-product of configured chains × supported protocols, filtered
/// to pairs whose chain entry actually carries that protocol's address.
///
/// Pure function of the config — rebuilt per run, never shared.
pub fn build_candidates(chains: &[ChainConfig]) -> Vec<Strategy> {
    let mut candidates = Vec::with_capacity(chains.len() * 2);
    for chain in chains {
        if chain.aave_v3_pool_addresses_provider.is_some() {
            candidates.push(Strategy::new(
                crate::model::strategy::AAVE_V3_PROTOCOL_ID,
                chain.chain_selector,
            ));
        }
        if chain.compound_v3_comet.is_some() {
            candidates.push(Strategy::new(
                crate::model::strategy::COMPOUND_V3_PROTOCOL_ID,
                chain.chain_selector,
            ));
        }
    }
    candidates
}

// ── Errors ──────────────────────────────────────────────────────────

/// Optimization is strict all-or-nothing: one bad candidate fails the
/// run rather than recommending a strategy off an incomplete comparison.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("no candidate strategies configured")]
    NoCandidates,

    #[error("APY calculation failed for {strategy}: {source:#}")]
    Candidate {
        strategy: Strategy,
        #[source]
        source: anyhow::Error,
    },

    /// Under this deployment's data-quality assumptions a true optimum
    /// is never zero-yield, so a zero reading signals a bad read.
    #[error("zero APY returned for {0}")]
    ZeroApy(Strategy),

    #[error("invalid APY value ({apy}) for {strategy}")]
    InvalidApy { strategy: Strategy, apy: f64 },
}

// ── Optimizer ───────────────────────────────────────────────────────

pub struct Optimizer {
    registry: AdapterRegistry,
}

impl Optimizer {
    pub fn new(registry: AdapterRegistry) -> Self {
        Optimizer { registry }
    }

    /// Evaluate every candidate concurrently and return the highest-APY
    /// strategy.
    ///
    /// The candidate structurally equal to `current` is evaluated with a
    /// zero deposit (its undisturbed yield); every other candidate gets
    /// the full `deposit`, as if the liquidity were moved there. All
    /// evaluations start before any is awaited, so run latency is
    /// bounded by the slowest candidate. The first failure in
    /// enumeration order aborts the run; in-flight siblings are left to
    /// finish on their own. Ties keep the earliest-enumerated candidate.
    pub async fn optimize(
        &self,
        chains: &[ChainConfig],
        candidates: &[Strategy],
        current: Strategy,
        deposit: U256,
    ) -> Result<StrategyWithApy, OptimizeError> {
        if candidates.is_empty() {
            return Err(OptimizeError::NoCandidates);
        }

        // Fan-out: one pipeline per candidate, none awaited yet.
        let pipelines: Vec<_> = candidates
            .iter()
            .map(|&strategy| {
                let amount = if strategy == current {
                    U256::ZERO
                } else {
                    deposit
                };
                let adapter = self.registry.get(strategy.protocol_id);
                async move {
                    match adapter {
                        Some(adapter) => {
                            adapter.get_apy(chains, strategy.chain_selector, amount).await
                        }
                        None => Err(anyhow::anyhow!(
                            "unsupported protocol id {:#x}",
                            strategy.protocol_id
                        )),
                    }
                }
            })
            .collect();

        // Fan-in: await everything, then validate in enumeration order.
        let results = future::join_all(pipelines).await;

        let mut best: Option<StrategyWithApy> = None;
        for (&strategy, result) in candidates.iter().zip(results) {
            let apy = result.map_err(|source| OptimizeError::Candidate { strategy, source })?;

            if apy == 0.0 {
                return Err(OptimizeError::ZeroApy(strategy));
            }
            if !apy.is_finite() {
                return Err(OptimizeError::InvalidApy { strategy, apy });
            }

            println!("  OPTIMIZER: {strategy} APY {:.4}%", apy * 100.0);

            // Strictly greater replaces the running best, so ties keep
            // the first-enumerated candidate.
            if best.is_none_or(|b| apy > b.apy) {
                best = Some(StrategyWithApy { strategy, apy });
            }
        }

        best.ok_or(OptimizeError::NoCandidates)
    }
}
