use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stablecoin yield rebalancer — compares lending APYs across chains
/// and keeps the pool's funds in the highest-yielding strategy.
#[derive(Parser)]
#[command(name = "yield-rebalancer", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Output the JSON schema for config files
    Schema,

    /// Validate a config file, reporting every problem found
    Validate {
        /// Path to the config JSON file
        config: PathBuf,
    },

    /// Pick the best approved pool from the public yield feed
    SelectPool,

    /// Run the rebalance workflow
    Run {
        /// Path to the config JSON file
        config: PathBuf,

        /// Execute once then exit (for external cron)
        #[arg(long)]
        once: bool,

        /// Log the decision without writing on-chain
        #[arg(long)]
        dry_run: bool,

        /// APY source: "onchain" (protocol reads) or "offchain" (yield feed)
        #[arg(long, default_value = "onchain")]
        source: String,
    },
}
