pub mod chain;
pub mod strategy;

pub use chain::{ChainConfig, ChainNotFound, find_chain};
pub use strategy::{Strategy, StrategyWithApy};
