use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use luxtensor_validator::chain::HttpChainProbe;
use luxtensor_validator::config::ValidatorConfig;
use luxtensor_validator::executor::WsMinerRpcProbe;
use luxtensor_validator::geolocator::StaticGeolocator;
use luxtensor_validator::miner_rpc::WsMinerRpc;
use luxtensor_validator::orchestrator::{HttpWeightSubmitter, RoundOrchestrator, RoundOutcome};
use luxtensor_validator::selector::StakeWeightedSelector;
use luxtensor_validator::smoother::RewardSmoother;
use luxtensor_validator::stats_store::{RocksStatsStore, StatsStore};
use luxtensor_validator::suspicion::StaticSuspicionSource;

#[derive(Parser)]
#[clap(name = "luxtensor-validator")]
#[clap(author, version, about = "LuxTensor subnet validator", long_about = None)]
struct Cli {
    /// Configuration file path
    #[clap(short, long, value_name = "FILE", default_value = "validator.toml")]
    config: String,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the validator's round loop
    Start,

    /// Write a default configuration file
    Init {
        #[clap(short, long, default_value = "validator.toml")]
        output: String,
    },

    /// Show validator version
    Version,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { output }) => init_config(&output)?,
        Some(Commands::Version) => show_version(),
        Some(Commands::Start) | None => start_validator(&cli.config).await?,
    }

    Ok(())
}

fn init_config(output: &str) -> Result<()> {
    let config = ValidatorConfig::default();
    config.to_file(std::path::Path::new(output))?;
    println!("Configuration file created: {output}");
    println!("Edit it and run: luxtensor-validator start");
    Ok(())
}

fn show_version() {
    println!("luxtensor-validator {}", env!("CARGO_PKG_VERSION"));
}

fn init_logging(config: &ValidatorConfig) -> Result<()> {
    let _ = config;
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    Ok(())
}

async fn start_validator(config_path: &str) -> Result<()> {
    let config = if std::path::Path::new(config_path).exists() {
        ValidatorConfig::from_file(std::path::Path::new(config_path))?
    } else {
        ValidatorConfig::default()
    };
    config.validate()?;

    init_logging(&config)?;
    info!(node_rpc_url = %config.node_rpc_url, "starting validator round loop");

    std::fs::create_dir_all(&config.data_dir)?;
    let stats_store = RocksStatsStore::open(&config.data_dir)?;

    let initial_average = stats_store.load_moving_average().await.unwrap_or_default();
    let smoother = RewardSmoother::new(config.smoothing_alpha, initial_average);

    let chain = HttpChainProbe::new(config.node_rpc_url.clone());
    let rpc = WsMinerRpcProbe;
    let miner_rpc = WsMinerRpc;
    let geolocator = StaticGeolocator::new(HashMap::new());
    let selector = StakeWeightedSelector::new(HashMap::new());
    let suspicion = StaticSuspicionSource::new(Default::default());
    let submitter = HttpWeightSubmitter::new(config.node_rpc_url.clone(), config.target_netuid);

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(config.round_interval_secs));

    loop {
        interval.tick().await;

        let orchestrator = RoundOrchestrator::new(
            &config,
            &chain,
            &rpc,
            &miner_rpc,
            &geolocator,
            &selector,
            &suspicion,
            &stats_store,
            &smoother,
            &submitter,
        );

        match orchestrator.run_round().await {
            RoundOutcome::Completed { scored_uids, elapsed_secs } => {
                info!(scored = scored_uids.len(), elapsed_secs, "round completed");
            }
            RoundOutcome::Skipped => {
                warn!("round skipped: no challenge could be generated");
            }
            RoundOutcome::Aborted(err) => {
                error!(error = %err, "round aborted");
            }
        }
    }
}

#[allow(dead_code)]
fn data_dir_default() -> PathBuf {
    PathBuf::from("./data/validator")
}
