//! Handshake Demo
//!
//! Runs both sides of the exchange in one process: each peer generates a
//! key pair, they swap base64 public keys, and one message travels from
//! Alice to Bob as a sealed payload.
//!
//! Usage: `handshake-demo [message...]`
//! Set `HANDSHAKE_CONFIG` to a JSON file to choose the curve and KDF.

use anyhow::{Context, ensure};
use tracing::info;

use crypto_session::{Peer, PeerConfig};

/// Message sent when none is given on the command line
const DEFAULT_MESSAGE: &str = "some random message...";

/// Environment variable naming an optional JSON config file
const CONFIG_ENV: &str = "HANDSHAKE_CONFIG";

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("handshake_demo=info".parse()?)
                .add_directive("crypto_session=info".parse()?),
        )
        .init();

    let config = load_config()?;
    info!(curve = %config.curve, kdf = ?config.kdf, "Starting handshake demo");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let message = if args.is_empty() {
        DEFAULT_MESSAGE.to_string()
    } else {
        args.join(" ")
    };

    let mut alice = Peer::new(config.clone());
    let mut bob = Peer::new(config);

    let alice_public = alice.generate_keys()?.to_base64();
    let bob_public = bob.generate_keys()?.to_base64();
    info!(alice = %alice_public, bob = %bob_public, "Exchanged public keys");

    alice
        .establish(&bob_public)
        .context("Alice failed to establish a session")?;
    bob.establish(&alice_public)
        .context("Bob failed to establish a session")?;

    let payload = alice.encrypt_message(&message)?;
    info!(%payload, "Alice sealed message");

    let decrypted = bob
        .decrypt_message(&payload)
        .context("Bob failed to open the payload")?;
    info!(%decrypted, "Bob opened message");

    ensure!(decrypted == message, "decrypted message does not match");
    println!("{}", decrypted);

    Ok(())
}

fn load_config() -> anyhow::Result<PeerConfig> {
    let Ok(path) = std::env::var(CONFIG_ENV) else {
        return Ok(PeerConfig::default());
    };

    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    PeerConfig::from_json(&json).with_context(|| format!("Invalid config file {}", path))
}
