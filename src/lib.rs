//! Stablecoin yield rebalancer.
//!
//! Reads supply rates from lending protocols across several chains,
//! projects the APY a simulated deposit would earn on each, and moves
//! the pool's active strategy to the best one through the parent-chain
//! rebalancer contract. An off-chain mode selects the best pool from a
//! public yield feed instead.

pub mod cli;
pub mod config;
pub mod decision;
pub mod evm;
pub mod model;
pub mod offchain;
pub mod onchain;
pub mod optimizer;
pub mod protocols;
pub mod rates;
pub mod schema;
pub mod workflow;
