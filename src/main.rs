use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;

use yield_rebalancer::cli::{Cli, Command};
use yield_rebalancer::config::Config;
use yield_rebalancer::decision::StrategyWriter;
use yield_rebalancer::offchain::{AllowList, HttpTransport, select_best_pool};
use yield_rebalancer::onchain::{DryRunWriter, EvmRegistryReader, EvmStrategyWriter};
use yield_rebalancer::protocols::AdapterRegistry;
use yield_rebalancer::schema;
use yield_rebalancer::workflow::{self, WorkflowDeps};

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by alloy/reqwest TLS)
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();

    match cli.command {
        Command::Schema => schema::run(),
        Command::Validate { config } => validate(&config),
        Command::SelectPool => select_pool().await,
        Command::Run {
            config,
            once,
            dry_run,
            source,
        } => run(&config, once, dry_run, &source).await,
    }
}

fn validate(path: &Path) -> Result<()> {
    let config = Config::load(path)?;
    match config.validate() {
        Ok(()) => {
            println!(
                "OK: {} chain(s), schedule {}",
                config.chains.len(),
                config.schedule
            );
            Ok(())
        }
        Err(errors) => {
            for e in &errors {
                eprintln!("error: {e}");
            }
            bail!("{} validation error(s)", errors.len());
        }
    }
}

async fn select_pool() -> Result<()> {
    let transport = HttpTransport::new();
    let pool = select_best_pool(&transport, &AllowList::defaults()).await?;
    println!(
        "{} {} on {}: {:.4}% APY",
        pool.project,
        pool.symbol,
        pool.chain,
        pool.apy.unwrap_or(0.0)
    );
    Ok(())
}

async fn run(path: &Path, once: bool, dry_run: bool, source: &str) -> Result<()> {
    let config = Config::load(path)?;
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("error: {e}");
        }
        bail!("config failed validation");
    }
    if source != "onchain" && source != "offchain" {
        bail!("unknown source '{source}', expected onchain or offchain");
    }

    let parent = config.parent()?.clone();
    let registry = Arc::new(EvmRegistryReader::new(parent.clone(), config.chains.clone()));
    let writer: Arc<dyn StrategyWriter> = if dry_run {
        Arc::new(DryRunWriter)
    } else {
        Arc::new(EvmStrategyWriter::from_env(parent)?)
    };
    let deps = WorkflowDeps {
        registry: registry.clone(),
        writer: writer.clone(),
        adapters: AdapterRegistry::evm_defaults(),
    };
    let transport = HttpTransport::new();

    let mut ticker = tokio::time::interval(config.schedule_interval()?);
    loop {
        ticker.tick().await;

        let result = if source == "onchain" {
            workflow::run_once(&config, &deps).await
        } else {
            workflow::run_once_offchain(&config, registry.as_ref(), writer.as_ref(), &transport)
                .await
        };

        match result {
            Ok(outcome) => println!("REBALANCE: done (updated: {})", outcome.updated),
            Err(e) if once => return Err(e),
            Err(e) => eprintln!("REBALANCE: run failed: {e:#}"),
        }

        if once {
            break;
        }
    }
    Ok(())
}
