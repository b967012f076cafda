//! Faucet service binary

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tap_common::utils::logging::{init_logging, LoggingConfig};
use tap_crypto::{address_from_key, FaucetKey};
use tap_faucet::{api, CommandRouter, FaucetConfig, FaucetService};
use tokio::signal;
use tracing::info;

/// Faucet service CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, env = "TAP_CONFIG", default_value = "faucet.toml")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP bridge (default)
    Serve,
    /// Print the faucet address derived from the configured key
    Address,
    /// Create a new mnemonic and print its key and address
    GenerateKey {
        /// Address prefix; defaults to the configured one
        #[arg(long)]
        prefix: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let config = load(&args.config, args.debug)?;
            serve(config).await
        }
        Command::Address => {
            let config = load(&args.config, args.debug)?;
            let settings = config.validate()?;
            println!("{}", settings.address);
            Ok(())
        }
        Command::GenerateKey { prefix } => {
            let prefix = match prefix {
                Some(prefix) => prefix,
                None => load(&args.config, args.debug)?.chain.address_prefix,
            };
            let (mnemonic, key) = FaucetKey::generate()?;
            println!("mnemonic:    {mnemonic}");
            println!("private key: {}", key.to_hex());
            println!("address:     {}", address_from_key(&key, &prefix)?);
            Ok(())
        }
    }
}

fn load(path: &Path, debug: bool) -> anyhow::Result<FaucetConfig> {
    let mut config = FaucetConfig::load(path)
        .with_context(|| format!("loading {}", path.display()))?;
    if debug {
        config.logging = LoggingConfig { level: "debug".to_string(), ..config.logging };
    }
    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("initializing logging: {e}"))?;
    Ok(config)
}

async fn serve(config: FaucetConfig) -> anyhow::Result<()> {
    info!("Starting Tap Faucet v{}", env!("CARGO_PKG_VERSION"));

    info!("Configuration:");
    info!("  Chain: {}", config.chain.chain_id);
    info!("  REST: {}", config.node.rest_url);
    info!("  RPC: {}", config.node.rpc_url);
    info!("  Denominations: {:?} / {:?}", config.tx.denominations, config.tx.amounts);
    info!("  Cooldown: {}s", config.faucet.cooldown_secs);

    let help = match &config.chat.help_file {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading help file {}", path.display()))?,
        ),
        None => None,
    };

    let service = Arc::new(FaucetService::from_config(&config)?);
    info!("Faucet service initialized");

    let commands = Arc::new(CommandRouter::new(service, config.chat.channels.clone(), help));
    let app = api::router(commands);

    let addr: SocketAddr = config.server.addr.parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down gracefully");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
