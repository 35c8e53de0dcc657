use std::collections::HashSet;
use std::fmt;
use std::io::{Cursor, Read};

use alloy::primitives::keccak256;
use anyhow::{Context, Result, anyhow};
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use thiserror::Error;

use crate::model::strategy::Strategy;

use super::feed::{FeedRequest, FeedTransport};

pub const DEFI_LLAMA_POOLS_URL: &str = "https://yields.llama.fi/pools";

// ── Pool record ─────────────────────────────────────────────────────

/// One entry of the yield feed's `data` array. Only the fields the
/// allow-list and ranking need are kept; everything else is skipped
/// during the streaming scan.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Pool {
    pub chain: String,
    pub project: String,
    pub symbol: String,
    #[serde(default)]
    pub apy: Option<f64>,
}

// ── Allow-list ──────────────────────────────────────────────────────

/// Chains, projects and symbols a pool must all match to be ranked.
#[derive(Debug, Clone)]
pub struct AllowList {
    pub chains: HashSet<String>,
    pub projects: HashSet<String>,
    pub symbols: HashSet<String>,
}

impl AllowList {
    /// USDC on Aave V3 / Compound V3 across the four supported chains.
    pub fn defaults() -> Self {
        let set = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        AllowList {
            chains: set(&["Ethereum", "Arbitrum", "Base", "Optimism"]),
            projects: set(&["aave-v3", "compound-v3"]),
            symbols: set(&["USDC"]),
        }
    }

    pub fn permits(&self, pool: &Pool) -> bool {
        self.chains.contains(&pool.chain)
            && self.projects.contains(&pool.project)
            && self.symbols.contains(&pool.symbol)
    }
}

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("yield feed request failed: {0:#}")]
    Transport(#[source] anyhow::Error),

    #[error("yield feed returned HTTP {0}")]
    Status(u16),

    #[error("failed to parse yield feed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("yield feed document has no top-level data array")]
    MissingDataKey,

    #[error("no pool passed the allow-list with a positive APY")]
    NoApprovedPool,
}

// ── Streaming scan ──────────────────────────────────────────────────

/// Walks the top-level object looking for the `data` key
/// (case-insensitive); other keys are skipped without buffering.
/// `None` means no such key appeared.
struct DocumentScan<'a> {
    allow: &'a AllowList,
}

impl<'de> DeserializeSeed<'de> for DocumentScan<'_> {
    type Value = Option<Option<Pool>>;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for DocumentScan<'_> {
    type Value = Option<Option<Pool>>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object containing a data array")
    }

    fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut found = None;
        while let Some(key) = map.next_key::<String>()? {
            if key.eq_ignore_ascii_case("data") {
                found = Some(map.next_value_seed(BestOfArray { allow: self.allow })?);
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(found)
    }
}

/// Folds the pool array down to the single best approved pool as it
/// streams past, so the full array is never held in memory. Only a
/// strictly higher APY displaces the running best; the maximum starts
/// at zero, so zero-yield pools never win.
struct BestOfArray<'a> {
    allow: &'a AllowList,
}

impl<'de> DeserializeSeed<'de> for BestOfArray<'_> {
    type Value = Option<Pool>;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for BestOfArray<'_> {
    type Value = Option<Pool>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of pool objects")
    }

    fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
    where
        S: SeqAccess<'de>,
    {
        let mut best: Option<Pool> = None;
        let mut max_apy = 0.0;
        while let Some(pool) = seq.next_element::<Pool>()? {
            if !self.allow.permits(&pool) {
                continue;
            }
            let Some(apy) = pool.apy else { continue };
            if apy.is_finite() && apy > max_apy {
                max_apy = apy;
                best = Some(pool);
            }
        }
        Ok(best)
    }
}

fn scan_stream<R: Read>(reader: R, allow: &AllowList) -> Result<Option<Pool>, SelectError> {
    let mut de = serde_json::Deserializer::from_reader(reader);
    let found = DocumentScan { allow }.deserialize(&mut de)?;
    found.ok_or(SelectError::MissingDataKey)
}

// ── Selection ───────────────────────────────────────────────────────

/// Fetch the yield feed and return the highest-APY pool that passes the
/// allow-list. The feed is several tens of megabytes, so the response
/// is decompressed and scanned as a stream.
pub async fn select_best_pool(
    transport: &dyn FeedTransport,
    allow: &AllowList,
) -> Result<Pool, SelectError> {
    let request = FeedRequest::get(DEFI_LLAMA_POOLS_URL).header("Accept-Encoding", "gzip");
    let response = transport
        .send(&request)
        .await
        .map_err(SelectError::Transport)?;
    if !response.is_success() {
        return Err(SelectError::Status(response.status));
    }

    let gzipped = response
        .header("Content-Encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("gzip"));

    let best = if gzipped {
        scan_stream(GzDecoder::new(Cursor::new(response.body)), allow)?
    } else {
        scan_stream(Cursor::new(response.body), allow)?
    };

    best.ok_or(SelectError::NoApprovedPool)
}

// ── Feed-name bridging ──────────────────────────────────────────────

/// CCIP chain selector for a feed chain name, as spelled by the feed.
pub fn chain_selector_from_name(name: &str) -> Option<u64> {
    match name {
        "Ethereum" => Some(5_009_297_550_715_157_269),
        "Arbitrum" => Some(4_949_039_107_694_359_620),
        "Base" => Some(15_971_525_489_660_198_786),
        "Optimism" => Some(3_734_403_246_176_062_136),
        _ => None,
    }
}

/// Map a feed pool to its on-chain strategy. The protocol id is the
/// keccak of the feed's project slug, matching the ids the on-chain
/// registry uses.
pub fn pool_to_strategy(pool: &Pool) -> Result<Strategy> {
    let chain_selector = chain_selector_from_name(&pool.chain)
        .ok_or_else(|| anyhow!("no chain selector known for feed chain '{}'", pool.chain))
        .with_context(|| format!("mapping pool {}/{}", pool.project, pool.symbol))?;
    Ok(Strategy::new(
        keccak256(pool.project.as_bytes()),
        chain_selector,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::strategy::{AAVE_V3_PROTOCOL_ID, COMPOUND_V3_PROTOCOL_ID};

    fn pool(chain: &str, project: &str, symbol: &str, apy: Option<f64>) -> Pool {
        Pool {
            chain: chain.into(),
            project: project.into(),
            symbol: symbol.into(),
            apy,
        }
    }

    #[test]
    fn allow_list_requires_all_three_fields() {
        let allow = AllowList::defaults();
        assert!(allow.permits(&pool("Ethereum", "aave-v3", "USDC", Some(1.0))));
        assert!(!allow.permits(&pool("Polygon", "aave-v3", "USDC", Some(1.0))));
        assert!(!allow.permits(&pool("Ethereum", "morpho", "USDC", Some(1.0))));
        assert!(!allow.permits(&pool("Ethereum", "aave-v3", "DAI", Some(1.0))));
    }

    #[test]
    fn feed_chain_names_map_to_ccip_selectors() {
        assert_eq!(
            chain_selector_from_name("Ethereum"),
            Some(5_009_297_550_715_157_269)
        );
        assert_eq!(
            chain_selector_from_name("Base"),
            Some(15_971_525_489_660_198_786)
        );
        assert_eq!(chain_selector_from_name("ethereum"), None);
        assert_eq!(chain_selector_from_name("Solana"), None);
    }

    #[test]
    fn pool_maps_to_registry_strategy() {
        let s = pool_to_strategy(&pool("Arbitrum", "aave-v3", "USDC", Some(3.2)))
            .expect("known chain");
        assert_eq!(s.protocol_id, AAVE_V3_PROTOCOL_ID);
        assert_eq!(s.chain_selector, 4_949_039_107_694_359_620);

        let s = pool_to_strategy(&pool("Optimism", "compound-v3", "USDC", Some(2.0)))
            .expect("known chain");
        assert_eq!(s.protocol_id, COMPOUND_V3_PROTOCOL_ID);
        assert_eq!(s.chain_selector, 3_734_403_246_176_062_136);
    }

    #[test]
    fn unknown_feed_chain_is_an_error() {
        assert!(pool_to_strategy(&pool("Gnosis", "aave-v3", "USDC", Some(9.0))).is_err());
    }
}
