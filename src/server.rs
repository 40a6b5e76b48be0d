//! Chat server instance
//!
//! Owns the listener, the shared registry, the global broadcast queue and
//! the distributor task. Nothing is process-global, so several servers can
//! run side by side (tests bind to port 0).

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::distributor::{BroadcastSender, Distributor};
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::registry::Registry;

/// State shared by every connection of one server
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub config: Arc<Config>,
    pub registry: Registry,
    /// Global broadcast queue, drained by the distributor
    pub queue: BroadcastSender,
    /// Cancelled to stop the whole server
    pub shutdown: CancellationToken,
}

/// A bound, not yet running, chat server
pub struct Server {
    listener: TcpListener,
    ctx: ServerContext,
    distributor: JoinHandle<()>,
}

impl Server {
    /// Bind the listener and start the distributor
    pub async fn bind(config: Config) -> Result<Self, AppError> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind_addr()).await?;
        info!("Chat server listening on {}", listener.local_addr()?);

        let registry = Registry::new();
        let (queue, queue_rx) = mpsc::channel(config.queue_capacity);
        let distributor = tokio::spawn(Distributor::new(registry.clone(), queue_rx).run());

        Ok(Self {
            listener,
            ctx: ServerContext {
                config: Arc::new(config),
                registry,
                queue,
                shutdown: CancellationToken::new(),
            },
            distributor,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the live user registry
    pub fn registry(&self) -> Registry {
        self.ctx.registry.clone()
    }

    /// Cancel the returned token to shut the server down
    pub fn shutdown_token(&self) -> CancellationToken {
        self.ctx.shutdown.clone()
    }

    /// Accept connections until shutdown
    ///
    /// On shutdown every connection is torn down by its watchdog, then the
    /// broadcast queue is closed and the distributor drains and stops.
    pub async fn run(self) -> Result<(), AppError> {
        let Server {
            listener,
            ctx,
            distributor,
        } = self;
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                () = ctx.shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("New connection from {}", addr);
                        let ctx = ctx.clone();

                        // Spawn handler task for each connection
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(stream, ctx).await {
                                error!("Connection handler error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        error!("Connection task failed: {}", e);
                    }
                }
            }
        }

        info!("Shutting down, {} connections open", connections.len());
        drop(listener);
        while connections.join_next().await.is_some() {}

        // Last queue sender; the distributor stops once it has drained
        drop(ctx);
        distributor.await?;

        info!("Chat server stopped");
        Ok(())
    }
}
