use std::sync::Mutex;

use anyhow::{Result, bail};
use async_trait::async_trait;

use yield_rebalancer::decision::{StrategyWriter, decide};
use yield_rebalancer::model::strategy::{
    AAVE_V3_PROTOCOL_ID, COMPOUND_V3_PROTOCOL_ID, Strategy,
};

const GAS_LIMIT: u64 = 750_000;

struct MockWriter {
    calls: Mutex<Vec<(Strategy, u64)>>,
    fail: bool,
}

impl MockWriter {
    fn new() -> Self {
        MockWriter {
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        MockWriter {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn calls(&self) -> Vec<(Strategy, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StrategyWriter for MockWriter {
    async fn write(&self, strategy: Strategy, gas_limit: u64) -> Result<String> {
        self.calls.lock().unwrap().push((strategy, gas_limit));
        if self.fail {
            bail!("execution reverted");
        }
        Ok("0xdeadbeef".into())
    }
}

#[tokio::test]
async fn unchanged_strategy_writes_nothing() {
    let writer = MockWriter::new();
    let s = Strategy::new(AAVE_V3_PROTOCOL_ID, 1);

    let result = decide(s, s, GAS_LIMIT, &writer).await.unwrap();
    assert!(!result.updated);
    assert_eq!(result.current, result.optimal);
    assert!(writer.calls().is_empty());
}

#[tokio::test]
async fn changed_strategy_writes_exactly_once_with_callers_gas() {
    let writer = MockWriter::new();
    let current = Strategy::new(AAVE_V3_PROTOCOL_ID, 1);
    let optimal = Strategy::new(COMPOUND_V3_PROTOCOL_ID, 2);

    let result = decide(current, optimal, GAS_LIMIT, &writer).await.unwrap();
    assert!(result.updated);
    assert_eq!(writer.calls(), vec![(optimal, GAS_LIMIT)]);
}

#[tokio::test]
async fn same_protocol_different_chain_still_rebalances() {
    let writer = MockWriter::new();
    let current = Strategy::new(AAVE_V3_PROTOCOL_ID, 1);
    let optimal = Strategy::new(AAVE_V3_PROTOCOL_ID, 2);

    let result = decide(current, optimal, GAS_LIMIT, &writer).await.unwrap();
    assert!(result.updated);
    assert_eq!(writer.calls().len(), 1);
}

#[tokio::test]
async fn write_failure_propagates_with_no_result() {
    let writer = MockWriter::failing();
    let current = Strategy::new(AAVE_V3_PROTOCOL_ID, 1);
    let optimal = Strategy::new(COMPOUND_V3_PROTOCOL_ID, 2);

    let err = decide(current, optimal, GAS_LIMIT, &writer).await.unwrap_err();
    assert!(format!("{err:#}").contains("execution reverted"));
    assert_eq!(writer.calls().len(), 1);
}
