//! utxo-pir binary: inspect the remote index and decode addresses

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use utxo_pir_client::ApiClient;
use utxo_pir_core::{decode_address, AddrType, ClientConfig, Coin, SearchType};

#[derive(Parser)]
#[command(name = "utxo-pir", version, about = "Private UTXO index client")]
struct Args {
    /// API endpoint
    #[arg(long, env = "CI_API_END_POINT")]
    endpoint: Option<String>,

    /// JSON client configuration; its endpoint is used unless --endpoint is given.
    /// Without it, CI_API_ID / CI_API_KEY / CI_API_END_POINT are read from the environment
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the coins served by the index
    Coins,
    /// Decode an address into coin, address type and search key
    Decode { address: String },
    /// Show the index descriptor of one view
    Info {
        coin: Coin,
        addr_type: AddrType,
        search_type: SearchType,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("utxo_pir=info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Decode { address } => {
            let decoded = decode_address(&address)?;
            println!("coin:      {}", decoded.coin);
            println!("addr_type: {}", decoded.addr_type);
            println!("key:       {}", hex::encode(decoded.key.as_bytes()));
        }
        Command::Coins => {
            let client = ApiClient::public(resolve_config(args.endpoint, args.config)?.endpoint)?;
            for coin in client.get_coins().await? {
                println!("{}", coin);
            }
        }
        Command::Info {
            coin,
            addr_type,
            search_type,
        } => {
            let client = ApiClient::public(resolve_config(args.endpoint, args.config)?.endpoint)?;
            let descriptor = client
                .get_index_descriptor(coin, addr_type, search_type)
                .await?;
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
    }

    Ok(())
}

fn resolve_config(endpoint: Option<String>, path: Option<PathBuf>) -> anyhow::Result<ClientConfig> {
    let mut config = match path {
        Some(path) => ClientConfig::load(&path)?,
        None => ClientConfig::from_env().unwrap_or_else(|| ClientConfig::new("", "")),
    };
    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint;
    }
    tracing::debug!(endpoint = %config.endpoint, nonce = ?config.nonce, "Configuration resolved");
    Ok(config)
}
