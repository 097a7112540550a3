//! sechat client entry point.
//!
//! Loads the configuration, connects to the server, generates this run's key
//! pair and hands everything to the event loop.
//!
//! # Architecture
//!
//! ```text
//! main()                      -- current-thread runtime, shut down
//!  │                             without waiting on the stdin reader
//!  └─ load_config()            -- sechat.toml, overridden by CLI flags
//!  └─ Session::new()           -- generates the own key pair
//!  └─ connect_with_retry()     -- TCP connect, bounded retries
//!  └─ EventLoop::run()         -- stdin + socket until exit
//! ```
//!
//! # Usage
//!
//! ```text
//! sechat [OPTIONS]
//!
//! Options:
//!   --server <HOST>    Server host name or IP   [env: SECHAT_SERVER]
//!   --port   <PORT>    Server TCP port          [env: SECHAT_PORT]
//!   --config <PATH>    Config file              [default: sechat.toml]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sechat_client::application::session::Session;
use sechat_client::infrastructure::config::{load_config, DEFAULT_CONFIG_FILE};
use sechat_client::infrastructure::console::Console;
use sechat_client::infrastructure::event_loop::EventLoop;
use sechat_client::infrastructure::network::{
    connect_with_retry, ConnectOptions, ServerConnection,
};
use sechat_core::SealedBoxCrypto;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// End-to-end encrypted chat client.
///
/// CLI flags take precedence over the config file.
#[derive(Debug, Parser)]
#[command(name = "sechat", about = "End-to-end encrypted chat client", version)]
struct Cli {
    /// Host name or IP address of the chat server.
    #[arg(long, env = "SECHAT_SERVER")]
    server: Option<String>,

    /// TCP port of the chat server.
    #[arg(long, env = "SECHAT_PORT")]
    port: Option<u16>,

    /// Path of the TOML config file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, env = "SECHAT_CONFIG")]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building the tokio runtime")?;
    let result = runtime.block_on(run(cli));

    // tokio reads stdin on a blocking thread that cannot be interrupted.
    // Leave it behind so the process exits without waiting for a keypress.
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(server) = cli.server {
        config.server.address = server;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Logs go to stderr; stdout carries the conversation.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.client.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("sechat client starting");

    let session = Session::new(Arc::new(SealedBoxCrypto::new()))
        .context("generating the client key pair")?;

    let options = ConnectOptions {
        endpoint: config.server.endpoint(),
        attempts: config.client.connect_attempts,
        retry_interval: config.client.retry_interval(),
    };
    let stream = connect_with_retry(&options).await?;

    let mut event_loop = EventLoop::new(
        session,
        BufReader::new(tokio::io::stdin()),
        ServerConnection::from_tcp(stream),
        Console::stdout(),
    );
    let reason = event_loop.run().await.context("chat session failed")?;

    info!(?reason, "sechat client stopped");
    Ok(())
}
