//! Group Chat Server - Entry Point
//!
//! Loads configuration, starts the server and stops it on Ctrl-C.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use group_chat::{AppError, Config, Server};

#[derive(Parser, Debug)]
#[command(name = "group_chat")]
#[command(version, about = "Multi-client TCP group chat server")]
struct Args {
    /// TOML config file
    #[arg(long, env = "GROUP_CHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long, env = "GROUP_CHAT_HOST")]
    host: Option<String>,

    /// TCP port
    #[arg(long, env = "GROUP_CHAT_PORT")]
    port: Option<u16>,

    /// Seconds of inactivity before a user is evicted
    #[arg(long, env = "GROUP_CHAT_IDLE_TIMEOUT_SECS")]
    idle_timeout_secs: Option<u64>,

    /// Per-user outbound queue size
    #[arg(long, env = "GROUP_CHAT_MAILBOX_CAPACITY")]
    mailbox_capacity: Option<usize>,
}

impl Args {
    /// File (or defaults) first, flags on top
    fn into_config(self) -> Result<Config, AppError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secs) = self.idle_timeout_secs {
            config.idle_timeout_secs = secs;
        }
        if let Some(capacity) = self.mailbox_capacity {
            config.mailbox_capacity = capacity;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=group_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("group_chat=info")),
        )
        .init();

    let config = Args::parse().into_config()?;

    let server = Server::bind(config).await?;
    let shutdown = server.shutdown_token();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.run().await?;
    Ok(())
}
