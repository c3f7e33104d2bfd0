//! snap-agent: wires a concrete `Agent` to the reference HTTP transport and
//! a couple of demo handlers for local runs.
//!
//! Run modes:
//!   cargo run                 - show usage
//!   cargo run -- serve        - start an HTTP-listening agent
//!   cargo run -- whoami       - derive and print this agent's address

use std::env;
use std::sync::Arc;

use snap_core::agent::Agent;
use snap_core::crypto::{KeyPair, Network};
use snap_core::transport::http::HttpTransport;
use snap_core::transport::Transport;
use snap_core::SnapConfig;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("serve") => run_serve().await,
        Some("whoami") => run_whoami(),
        Some("help") | Some("--help") | Some("-h") | None => print_usage(),
        Some(other) => {
            eprintln!("unknown command: {other}");
            print_usage();
        }
    }
}

fn print_usage() {
    println!("snap-agent - SNAP protocol reference peer");
    println!();
    println!("Usage:");
    println!("  snap-agent serve      Start an HTTP-listening agent");
    println!("  snap-agent whoami     Print this agent's P2TR address");
    println!();
    println!("Environment Variables:");
    println!("  SNAP_PRIVATE_KEY        Hex-encoded 32-byte secret (generates an ephemeral key if unset)");
    println!("  SNAP_NETWORK            mainnet | testnet (default: testnet)");
    println!("  SNAP_HTTP_BIND_ADDRESS  Bind address for the HTTP transport (default: 127.0.0.1:7780)");
    println!("  SNAP_REPLAY_TTL_SECS    Replay store entry lifetime in seconds (default: 3600)");
    println!("  SNAP_TIMESTAMP_SKEW_SECS  Maximum accepted message clock skew (default: 60)");
    println!("  SNAP_LOG_LEVEL          Log level (default: info)");
}

fn load_keypair(network: Network) -> KeyPair {
    match env::var("SNAP_PRIVATE_KEY") {
        Ok(hex_key) => match hex::decode(hex_key.trim()) {
            Ok(bytes) if bytes.len() == 32 => {
                let mut secret = [0u8; 32];
                secret.copy_from_slice(&bytes);
                KeyPair::from_secret_bytes(secret, network)
                    .unwrap_or_else(|e| {
                        eprintln!("invalid SNAP_PRIVATE_KEY: {e}, generating an ephemeral key instead");
                        KeyPair::generate(network)
                    })
            }
            _ => {
                eprintln!("SNAP_PRIVATE_KEY must be 32 bytes of hex, generating an ephemeral key instead");
                KeyPair::generate(network)
            }
        },
        Err(_) => KeyPair::generate(network),
    }
}

fn run_whoami() {
    let config = SnapConfig::from_env().unwrap_or_else(|e| {
        eprintln!("invalid configuration: {e}");
        std::process::exit(1);
    });
    let keypair = load_keypair(config.network);
    println!("{}", keypair.address());
}

/// `message/echo` demo handler: returns the request payload unchanged.
fn echo_handler() -> snap_core::agent::registry::RequestHandler {
    Arc::new(|message| Box::pin(async move { Ok(message.payload) }))
}

/// `message/ping` demo handler: ignores the payload and replies `{"pong": true}`.
fn ping_handler() -> snap_core::agent::registry::RequestHandler {
    Arc::new(|_message| Box::pin(async move { Ok(serde_json::json!({"pong": true})) }))
}

async fn run_serve() {
    let config = match SnapConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = snap_core::logging::init_from_config(&config) {
        eprintln!("failed to initialize logging: {e}");
    }

    let keypair = load_keypair(config.network);
    tracing::info!(address = keypair.address(), "starting snap-agent");

    let replay_store = Arc::new(snap_core::storage::InMemoryReplayStore::new());
    let agent = Agent::builder(keypair).replay_store(replay_store).build();

    agent.register_handler("message/echo", echo_handler()).await;
    agent.register_handler("message/ping", ping_handler()).await;

    let transport = HttpTransport::new();
    let handler = agent.inbound_handler();

    tracing::info!(bind = config.http_bind_address.as_str(), "listening");
    if let Err(e) = transport.listen(&config.http_bind_address, handler).await {
        eprintln!("transport error: {e}");
        std::process::exit(1);
    }
}
