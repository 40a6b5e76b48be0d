//! User record and mailbox definitions
//!
//! Represents a connected user with their display name and outbound queue.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::DeliveryError;
use crate::message::ServerMessage;
use crate::types::UserId;

/// Receiving half of a mailbox, owned by the connection's writer
pub type MailboxReceiver = mpsc::Receiver<ServerMessage>;

/// Create a bounded mailbox
pub fn mailbox(capacity: usize) -> (Mailbox, MailboxReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (Mailbox(tx), rx)
}

/// Sending half of a user's bounded outbound queue
///
/// Delivery never waits: a full mailbox drops the incoming message.
#[derive(Debug, Clone)]
pub struct Mailbox(mpsc::Sender<ServerMessage>);

impl Mailbox {
    /// Push a message without waiting
    ///
    /// Returns `DeliveryError::Full` if the mailbox is at capacity (the
    /// message is dropped) and `DeliveryError::Closed` if the writer is gone.
    pub fn deliver(&self, msg: ServerMessage) -> Result<(), DeliveryError> {
        self.0.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Connected user information
///
/// Cloning a `User` yields a snapshot of the name plus a handle to the
/// same mailbox.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique identifier (peer address)
    pub id: UserId,
    /// Display name, initially the id's text
    pub name: String,
    /// Server → Client message queue
    pub mailbox: Mailbox,
}

impl User {
    /// Create a new user with the given ID, name and mailbox
    pub fn new(id: UserId, name: String, mailbox: Mailbox) -> Self {
        Self { id, name, mailbox }
    }

    /// Set the user's display name
    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }
}
