//! Broadcast distributor
//!
//! The single consumer of the global message queue. Every dequeued message
//! is pushed into the mailbox of every registered user.
//!
//! Mailbox pushes never wait. When a mailbox is full the incoming message is
//! dropped for that user only (drop-incoming), so a stalled client cannot
//! hold up delivery to anyone else.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::DeliveryError;
use crate::message::ServerMessage;
use crate::registry::Registry;

/// Sending half of the global queue
pub type BroadcastSender = mpsc::Sender<ServerMessage>;

/// Outcome of delivering one message to every mailbox
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Mailboxes that accepted the message
    pub delivered: usize,
    /// Mailboxes that were full; the message was dropped for them
    pub dropped: usize,
    /// Mailboxes whose writer had already gone away
    pub closed: usize,
}

/// The broadcast distributor actor
pub struct Distributor {
    registry: Registry,
    /// Global queue receiver
    receiver: mpsc::Receiver<ServerMessage>,
}

impl Distributor {
    /// Create a distributor over the given registry and queue receiver
    pub fn new(registry: Registry, receiver: mpsc::Receiver<ServerMessage>) -> Self {
        Self { registry, receiver }
    }

    /// Run the distribution loop
    ///
    /// Continuously receives and fans out messages until all senders are dropped.
    pub async fn run(mut self) {
        info!("Distributor started");

        while let Some(msg) = self.receiver.recv().await {
            let report = fan_out(&self.registry, &msg);
            debug!(
                "Broadcast delivered to {}, dropped for {}, closed for {}",
                report.delivered, report.dropped, report.closed
            );
        }

        info!("Distributor shutting down");
    }
}

/// Push one message into every live mailbox
pub fn fan_out(registry: &Registry, msg: &ServerMessage) -> FanoutReport {
    let mut report = FanoutReport::default();

    for (id, mailbox) in registry.mailboxes() {
        match mailbox.deliver(msg.clone()) {
            Ok(()) => report.delivered += 1,
            Err(DeliveryError::Full) => {
                warn!("Mailbox of {} is full, dropping broadcast", id);
                report.dropped += 1;
            }
            Err(DeliveryError::Closed) => {
                debug!("Mailbox of {} is closed, skipping", id);
                report.closed += 1;
            }
        }
    }

    report
}
