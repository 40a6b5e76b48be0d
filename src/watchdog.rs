//! Per-connection idle watchdog
//!
//! The only component allowed to end a connection. It removes the user from
//! the registry, announces the logout and cancels the connection's closing
//! token, which makes the session and the writer release the socket.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::distributor::BroadcastSender;
use crate::message::ServerMessage;
use crate::registry::Registry;
use crate::types::{Signal, Teardown, UserId};

/// Default inactivity window before a user is evicted
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Watchdog for a single connection
pub struct Watchdog {
    user_id: UserId,
    registry: Registry,
    queue: BroadcastSender,
    signals: mpsc::Receiver<Signal>,
    /// Cancelled by this watchdog only, once teardown is done
    closing: CancellationToken,
    /// Server-wide shutdown
    shutdown: CancellationToken,
    idle_timeout: Duration,
}

impl Watchdog {
    pub fn new(
        user_id: UserId,
        registry: Registry,
        queue: BroadcastSender,
        signals: mpsc::Receiver<Signal>,
        closing: CancellationToken,
        shutdown: CancellationToken,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            user_id,
            registry,
            queue,
            signals,
            closing,
            shutdown,
            idle_timeout,
        }
    }

    /// Wait for the first of quit, idle timeout or shutdown, then tear down
    pub async fn run(mut self) -> Teardown {
        let idle = time::sleep(self.idle_timeout);
        tokio::pin!(idle);

        let reason = loop {
            tokio::select! {
                signal = self.signals.recv() => match signal {
                    Some(Signal::Activity) => {
                        debug!("Activity from {}, resetting idle timer", self.user_id);
                        idle.as_mut().reset(Instant::now() + self.idle_timeout);
                    }
                    Some(Signal::Quit(reason)) => break Teardown::Quit(reason),
                    None => break Teardown::Abandoned,
                },
                () = &mut idle => break Teardown::IdleTimeout,
                () = self.shutdown.cancelled() => break Teardown::ServerShutdown,
            }
        };

        self.teardown(reason).await;
        reason
    }

    async fn teardown(&self, reason: Teardown) {
        match self.registry.remove(self.user_id) {
            Ok(user) => {
                info!("User {} ({}) leaving: {:?}", self.user_id, user.name, reason);
                let notice = if reason.is_timeout() {
                    ServerMessage::TimedOut { name: user.name }
                } else {
                    ServerMessage::Logout { name: user.name }
                };
                if self.queue.send(notice).await.is_err() {
                    debug!("Broadcast queue closed, logout of {} not announced", self.user_id);
                }
            }
            Err(e) => {
                warn!("Teardown of {}: {}", self.user_id, e);
            }
        }

        self.closing.cancel();
    }
}
