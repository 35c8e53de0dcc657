use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{Context, Result};

/// Read-only provider for view calls.
pub fn read_provider(rpc_url: &str) -> Result<impl Provider + Clone> {
    let url = rpc_url
        .parse()
        .with_context(|| format!("invalid RPC URL '{rpc_url}'"))?;
    Ok(ProviderBuilder::new().connect_http(url))
}

/// Wallet-backed provider for state-changing transactions.
pub fn write_provider(private_key: &str, rpc_url: &str) -> Result<impl Provider + Clone> {
    let signer: alloy::signers::local::PrivateKeySigner = private_key
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid key: {e}"))?;
    let wallet = alloy::network::EthereumWallet::from(signer);
    let url = rpc_url
        .parse()
        .with_context(|| format!("invalid RPC URL '{rpc_url}'"))?;
    Ok(ProviderBuilder::new().wallet(wallet).connect_http(url))
}

/// Fail if a submitted transaction reverted.
pub fn require_success(receipt: &alloy::rpc::types::TransactionReceipt, label: &str) -> Result<()> {
    if !receipt.status() {
        anyhow::bail!(
            "{} tx reverted (hash: {:?}, gas_used: {:?})",
            label,
            receipt.transaction_hash,
            receipt.gas_used,
        );
    }
    Ok(())
}
