//! `send-engine` command-line front end.
//!
//! Reads wallets and chain endpoints from a TOML file, keys from
//! `SEND_ENGINE_KEY_<WALLET_ID>`, and keeps send records in a JSON file.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use send_engine::config::load_config;
use send_engine::engine::services_from_config;
use send_engine::lifecycle::FileStore;
use send_engine::observability::init_logging;
use send_engine::signer::{EnvKeyOracle, Signer};
use send_engine::{FeeTier, SendEngine, SendError, StaticWallets};

#[derive(Parser)]
#[command(name = "send-engine")]
#[command(about = "Build, sign and broadcast transfers on Bitcoin, EVM chains and Solana", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "send-engine.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fee estimates for every tier on the wallet's chain
    Fees { wallet: String },
    /// Current balance of a wallet
    Balance { wallet: String },
    /// Build a send and store it as BUILDING
    Create {
        wallet: String,
        to: String,
        /// Amount in display units (e.g. 0.001)
        amount: String,
        #[arg(long, default_value = "normal")]
        tier: FeeTier,
    },
    /// Rebuild a BUILDING send against fresh chain state
    Rebuild { id: String },
    /// Sign a stored send
    Sign { id: String },
    /// Broadcast a signed send
    Broadcast { id: String },
    /// Create, sign and broadcast in one go
    Send {
        wallet: String,
        to: String,
        amount: String,
        #[arg(long, default_value = "normal")]
        tier: FeeTier,
    },
    /// Show a stored send, reconciling it if a broadcast is in flight
    Show { id: String },
    /// List a wallet's sends
    List { wallet: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), SendError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| SendError::Storage(format!("cannot render output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

async fn run(engine: &SendEngine, command: Commands) -> Result<(), SendError> {
    match command {
        Commands::Fees { wallet } => print_json(&engine.estimate_fees(&wallet).await?),
        Commands::Balance { wallet } => print_json(&engine.balance(&wallet).await?),
        Commands::Create {
            wallet,
            to,
            amount,
            tier,
        } => print_json(&engine.create_send(&wallet, &to, &amount, tier).await?),
        Commands::Rebuild { id } => print_json(&engine.rebuild(&id).await?),
        Commands::Sign { id } => print_json(&engine.sign(&id).await?),
        Commands::Broadcast { id } => print_json(&engine.broadcast(&id).await?),
        Commands::Send {
            wallet,
            to,
            amount,
            tier,
        } => {
            let record = engine.create_send(&wallet, &to, &amount, tier).await?;
            engine.sign(&record.id).await?;
            engine.broadcast(&record.id).await?;
            print_json(&engine.record(&record.id).await?)
        }
        Commands::Show { id } => print_json(&engine.reconcile(&id).await?),
        Commands::List { wallet } => print_json(&engine.records_for_wallet(&wallet).await?),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    init_logging(&config.observability);

    tracing::info!(config = %cli.config.display(), "send-engine v{} starting", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(FileStore::open(&config.store.path)?);
    let services = services_from_config(&config).await?;
    let engine = SendEngine::new(
        services,
        Signer::new(Arc::new(EnvKeyOracle)),
        store,
        Arc::new(StaticWallets::from_config(&config.wallets)),
    );

    // Ctrl-C drops the in-flight future at its next suspension point. A
    // broadcast that already reached the network stays BROADCASTING and
    // `show` reconciles it later.
    let result = tokio::select! {
        result = run(&engine, cli.command) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted");
            std::process::exit(130);
        }
    };

    if let Err(e) = result {
        eprintln!("error [{:?}]: {}", e.kind(), e);
        std::process::exit(1);
    }
    Ok(())
}
