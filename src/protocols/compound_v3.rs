use alloy::eips::BlockId;
use alloy::primitives::{B256, U256};
use alloy::providers::Provider;
use alloy::sol;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;

use crate::evm;
use crate::model::chain::{ChainConfig, find_chain};
use crate::model::strategy::COMPOUND_V3_PROTOCOL_ID;
use crate::rates::{self, AnnualizedRate, SECONDS_PER_YEAR};

use super::ProtocolAdapter;

// ── Compound V3 (Comet) interface ───────────────────────────────────

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IComet {
        function totalSupply() external view returns (uint256);
        function totalBorrow() external view returns (uint256);
        function getSupplyRate(uint256 utilization) external view returns (uint64);
    }
}

/// WAD (1e18), Comet's fixed-point unit for utilization and rates.
const WAD_UNITS: u64 = 1_000_000_000_000_000_000;

// ── Adapter ─────────────────────────────────────────────────────────

/// Compound-style adapter. The Comet market address is configured
/// directly per chain. The projected APY folds the simulated deposit
/// into total supply before asking Comet for the supply rate at the
/// resulting utilization.
pub struct CompoundV3Adapter;

#[async_trait]
impl ProtocolAdapter for CompoundV3Adapter {
    fn protocol_id(&self) -> B256 {
        COMPOUND_V3_PROTOCOL_ID
    }

    fn name(&self) -> &'static str {
        "compound-v3"
    }

    async fn get_apy(
        &self,
        chains: &[ChainConfig],
        chain_selector: u64,
        deposit: U256,
    ) -> Result<f64> {
        let chain = find_chain(chains, chain_selector)?;
        let comet_addr = chain.comet()?;

        let provider = evm::read_provider(&chain.rpc_url)?;

        // One pinned block for the supply/borrow pair; utilization from
        // torn snapshots would be meaningless.
        let pinned = BlockId::number(
            provider
                .get_block_number()
                .await
                .with_context(|| format!("resolving head block on {}", chain.name))?,
        );

        let comet = IComet::new(comet_addr, &provider);

        let mut total_supply = comet
            .totalSupply()
            .block(pinned)
            .call()
            .await
            .with_context(|| format!("Comet totalSupply on {}", chain.name))?;
        if !deposit.is_zero() {
            total_supply += deposit;
        }
        if total_supply.is_zero() {
            bail!("Comet total supply is zero on {}, cannot compute utilization", chain.name);
        }

        let total_borrow = comet
            .totalBorrow()
            .block(pinned)
            .call()
            .await
            .with_context(|| format!("Comet totalBorrow on {}", chain.name))?;

        let utilization = total_borrow * U256::from(WAD_UNITS) / total_supply;

        // Per-second supply rate, WAD-scaled.
        let supply_rate = comet
            .getSupplyRate(utilization)
            .block(pinned)
            .call()
            .await
            .with_context(|| format!("Comet getSupplyRate on {}", chain.name))?;
        if supply_rate == 0 {
            return Ok(0.0);
        }

        let apy = rates::annualize(
            AnnualizedRate::PerSecond(rates::wad_per_second_to_ratio(supply_rate)),
            SECONDS_PER_YEAR,
        )
        .with_context(|| format!("annualizing Comet supply rate on {}", chain.name))?;
        Ok(apy)
    }
}
