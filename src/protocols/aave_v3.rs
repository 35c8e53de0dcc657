use alloy::eips::BlockId;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::Provider;
use alloy::sol;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use thiserror::Error;

use crate::evm;
use crate::model::chain::{ChainConfig, find_chain};
use crate::model::strategy::AAVE_V3_PROTOCOL_ID;
use crate::rates::{self, AnnualizedRate, SECONDS_PER_YEAR};

use super::ProtocolAdapter;

// ── Aave V3 contract interfaces ─────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IPoolAddressesProvider {
        function getPoolDataProvider() external view returns (address);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IAaveProtocolDataProvider {
        function getReserveData(address asset) external view returns (
            uint256 unbacked, uint256 accruedToTreasuryScaled, uint256 totalAToken,
            uint256 totalStableDebt, uint256 totalVariableDebt, uint256 liquidityRate,
            uint256 variableBorrowRate, uint256 stableBorrowRate, uint256 averageStableBorrowRate,
            uint256 liquidityIndex, uint256 variableBorrowIndex, uint40 lastUpdateTimestamp
        );
        function getVirtualUnderlyingBalance(address asset) external view returns (uint128);
        function getReserveConfigurationData(address asset) external view returns (
            uint256 decimals, uint256 ltv, uint256 liquidationThreshold, uint256 liquidationBonus,
            uint256 reserveFactor, bool usageAsCollateralEnabled, bool borrowingEnabled,
            bool stableBorrowRateEnabled, bool isActive, bool isFrozen
        );
        function getInterestRateStrategyAddress(address asset) external view returns (address);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    contract IReserveInterestRateStrategy {
        struct CalculateInterestRatesParams {
            uint256 unbacked;
            uint256 liquidityAdded;
            uint256 liquidityTaken;
            uint256 totalDebt;
            uint256 reserveFactor;
            address reserve;
            bool usingVirtualBalance;
            uint256 virtualUnderlyingBalance;
        }
        function calculateInterestRates(CalculateInterestRatesParams memory params)
            external view returns (uint256 liquidityRate, uint256 variableBorrowRate);
    }
}

// ── Rate-formula inputs ─────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
#[error("rate parameter `{0}` is missing (a present-but-zero value must be set explicitly)")]
pub struct MissingRateParameter(pub &'static str);

/// Inputs to Aave's `calculateInterestRates`, gathered across several
/// reads. Every numeric field must be filled in before [`finish`]; a
/// field left `None` is a caller bug, distinct from a legitimate zero.
///
/// [`finish`]: RateParameters::finish
#[derive(Debug, Default)]
pub struct RateParameters {
    pub unbacked: Option<U256>,
    pub liquidity_added: Option<U256>,
    pub liquidity_taken: Option<U256>,
    pub total_debt: Option<U256>,
    pub reserve_factor: Option<U256>,
    pub reserve: Option<Address>,
    pub using_virtual_balance: bool,
    pub virtual_underlying_balance: Option<U256>,
}

impl RateParameters {
    /// Validate completeness and produce the on-chain call payload.
    pub fn finish(
        self,
    ) -> Result<IReserveInterestRateStrategy::CalculateInterestRatesParams, MissingRateParameter>
    {
        let unbacked = self.unbacked.ok_or(MissingRateParameter("unbacked"))?;
        let liquidity_added = self
            .liquidity_added
            .ok_or(MissingRateParameter("liquidity_added"))?;
        let liquidity_taken = self
            .liquidity_taken
            .ok_or(MissingRateParameter("liquidity_taken"))?;
        let total_debt = self.total_debt.ok_or(MissingRateParameter("total_debt"))?;
        let reserve_factor = self
            .reserve_factor
            .ok_or(MissingRateParameter("reserve_factor"))?;
        let reserve = self.reserve.ok_or(MissingRateParameter("reserve"))?;
        let virtual_underlying_balance = self
            .virtual_underlying_balance
            .ok_or(MissingRateParameter("virtual_underlying_balance"))?;

        Ok(IReserveInterestRateStrategy::CalculateInterestRatesParams {
            unbacked,
            liquidityAdded: liquidity_added,
            liquidityTaken: liquidity_taken,
            totalDebt: total_debt,
            reserveFactor: reserve_factor,
            reserve,
            usingVirtualBalance: self.using_virtual_balance,
            virtualUnderlyingBalance: virtual_underlying_balance,
        })
    }
}

// ── Adapter ─────────────────────────────────────────────────────────

/// Aave-style adapter. The addresses-provider root is configured per
/// chain; the data provider and interest-rate strategy contracts are
/// discovered from it at runtime. The supply rate comes from the
/// strategy contract's own `calculateInterestRates` simulation, so the
/// projected post-deposit APY uses the exact on-chain formula.
pub struct AaveV3Adapter;

#[async_trait]
impl ProtocolAdapter for AaveV3Adapter {
    fn protocol_id(&self) -> B256 {
        AAVE_V3_PROTOCOL_ID
    }

    fn name(&self) -> &'static str {
        "aave-v3"
    }

    async fn get_apy(
        &self,
        chains: &[ChainConfig],
        chain_selector: u64,
        deposit: U256,
    ) -> Result<f64> {
        let chain = find_chain(chains, chain_selector)?;
        let addresses_provider_addr = chain.aave_addresses_provider()?;
        let asset = chain.usdc()?;

        let provider = evm::read_provider(&chain.rpc_url)?;

        // Pin every read in this pipeline to one block; mixing "latest"
        // snapshots across sequential calls would tear the rate inputs.
        let pinned = BlockId::number(
            provider
                .get_block_number()
                .await
                .with_context(|| format!("resolving head block on {}", chain.name))?,
        );

        let addresses_provider = IPoolAddressesProvider::new(addresses_provider_addr, &provider);
        let data_provider_addr = addresses_provider
            .getPoolDataProvider()
            .block(pinned)
            .call()
            .await
            .with_context(|| format!("getPoolDataProvider on {}", chain.name))?;
        if data_provider_addr == Address::ZERO {
            bail!("PoolAddressesProvider returned zero data provider address on {}", chain.name);
        }

        let data_provider = IAaveProtocolDataProvider::new(data_provider_addr, &provider);

        let strategy_addr = data_provider
            .getInterestRateStrategyAddress(asset)
            .block(pinned)
            .call()
            .await
            .with_context(|| format!("getInterestRateStrategyAddress on {}", chain.name))?;
        if strategy_addr == Address::ZERO {
            bail!("zero interest rate strategy address for reserve on {}", chain.name);
        }

        let reserve_data = data_provider
            .getReserveData(asset)
            .block(pinned)
            .call()
            .await
            .with_context(|| format!("getReserveData on {}", chain.name))?;

        let virtual_balance = data_provider
            .getVirtualUnderlyingBalance(asset)
            .block(pinned)
            .call()
            .await
            .with_context(|| format!("getVirtualUnderlyingBalance on {}", chain.name))?;

        let reserve_config = data_provider
            .getReserveConfigurationData(asset)
            .block(pinned)
            .call()
            .await
            .with_context(|| format!("getReserveConfigurationData on {}", chain.name))?;

        // usingVirtualBalance must be true for non-mintable assets like
        // USDC; with false the contract short-circuits to the base rate.
        // liquidityTaken stays zero — we only simulate deposits.
        let params = RateParameters {
            unbacked: Some(reserve_data.unbacked),
            liquidity_added: Some(deposit),
            liquidity_taken: Some(U256::ZERO),
            total_debt: Some(reserve_data.totalStableDebt + reserve_data.totalVariableDebt),
            reserve_factor: Some(reserve_config.reserveFactor),
            reserve: Some(asset),
            using_virtual_balance: true,
            virtual_underlying_balance: Some(U256::from(virtual_balance)),
        }
        .finish()?;

        let strategy = IReserveInterestRateStrategy::new(strategy_addr, &provider);
        let rates_out = strategy
            .calculateInterestRates(params)
            .block(pinned)
            .call()
            .await
            .with_context(|| format!("calculateInterestRates on {}", chain.name))?;

        // liquidityRate is the supply-side APR in RAY; an underutilized
        // pool legitimately reports zero.
        let liquidity_rate = rates_out.liquidityRate;
        if liquidity_rate.is_zero() {
            return Ok(0.0);
        }

        let apy = rates::annualize(
            AnnualizedRate::Annual(rates::ray_to_ratio(liquidity_rate)),
            SECONDS_PER_YEAR,
        )
        .with_context(|| format!("annualizing Aave liquidity rate on {}", chain.name))?;
        Ok(apy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_params() -> RateParameters {
        RateParameters {
            unbacked: Some(U256::ZERO),
            liquidity_added: Some(U256::from(1_000_000u64)),
            liquidity_taken: Some(U256::ZERO),
            total_debt: Some(U256::from(42u64)),
            reserve_factor: Some(U256::from(1000u64)),
            reserve: Some(Address::repeat_byte(0x11)),
            using_virtual_balance: true,
            virtual_underlying_balance: Some(U256::ZERO),
        }
    }

    #[test]
    fn finish_accepts_complete_params_with_zeros() {
        // Present-but-zero is valid; only None is rejected.
        let out = complete_params().finish().unwrap();
        assert_eq!(out.liquidityAdded, U256::from(1_000_000u64));
        assert!(out.usingVirtualBalance);
    }

    #[test]
    fn finish_rejects_each_missing_field_by_name() {
        let mut p = complete_params();
        p.total_debt = None;
        assert_eq!(p.finish().unwrap_err(), MissingRateParameter("total_debt"));

        let mut p = complete_params();
        p.virtual_underlying_balance = None;
        assert_eq!(
            p.finish().unwrap_err(),
            MissingRateParameter("virtual_underlying_balance")
        );

        let p = RateParameters::default();
        assert_eq!(p.finish().unwrap_err(), MissingRateParameter("unbacked"));
    }
}
