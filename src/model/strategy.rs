use alloy::primitives::{B256, b256};
use serde::Serialize;

// ── Protocol identifiers ─────────────────────────────────────────────
//
// Protocol ids are keccak256 digests of the protocol's registry name,
// matching what the on-chain strategy registry stores.

/// keccak256("aave-v3")
pub const AAVE_V3_PROTOCOL_ID: B256 =
    b256!("0xbbbf88eb3aaea499bd8961e51ce38087d4dda7879001b87ead64f8a7a3d0b2da");

/// keccak256("compound-v3")
pub const COMPOUND_V3_PROTOCOL_ID: B256 =
    b256!("0x3af167fff8b2aadd8bc497987eee3c5c291f8d6741dda2249d1df61732ddfda1");

// ── Stablecoin identifiers ───────────────────────────────────────────

/// keccak256("USDC")
pub const USDC_ID: B256 =
    b256!("0xd6aca1be9729c13d677335161321649cccae6a591554772516700f986f942eaa");

/// keccak256("USDT")
pub const USDT_ID: B256 =
    b256!("0x8b1a1d9c2b109e527c9134b25b1a1833b16b6594f92daa9f6d9b7a6024bce9d0");

/// keccak256("GHO")
pub const GHO_ID: B256 =
    b256!("0x89e8b9b34729373f6e100fab106bfc0a1e41df9e1d7194f4f19add5de2da7772");

/// Human-readable name for a known protocol id, if we recognize it.
pub fn protocol_name(id: B256) -> Option<&'static str> {
    match id {
        AAVE_V3_PROTOCOL_ID => Some("aave-v3"),
        COMPOUND_V3_PROTOCOL_ID => Some("compound-v3"),
        _ => None,
    }
}

// ── Strategy ─────────────────────────────────────────────────────────

/// A yield destination: which lending protocol, on which chain.
///
/// Equality is structural — two strategies are the same destination iff
/// both the protocol id and the chain selector match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Strategy {
    /// keccak256 digest of the protocol name (see constants above).
    pub protocol_id: B256,
    /// CCIP-style unsigned 64-bit chain identifier.
    pub chain_selector: u64,
}

impl Strategy {
    pub fn new(protocol_id: B256, chain_selector: u64) -> Self {
        Strategy {
            protocol_id,
            chain_selector,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match protocol_name(self.protocol_id) {
            Some(name) => write!(f, "{}@{}", name, self.chain_selector),
            None => write!(f, "{:#x}@{}", self.protocol_id, self.chain_selector),
        }
    }
}

/// A strategy paired with the APY computed for it during one
/// optimization run. Ephemeral — never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyWithApy {
    pub strategy: Strategy,
    /// Decimal fraction, e.g. 0.0523 = 5.23%.
    pub apy: f64,
}
