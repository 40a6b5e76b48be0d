//! Per-connection session
//!
//! Reads newline-delimited lines from the client and dispatches them:
//! commands are answered through the user's own mailbox, everything else
//! goes onto the global broadcast queue.

use std::io::ErrorKind;

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::distributor::BroadcastSender;
use crate::error::AppError;
use crate::message::{Command, ServerMessage};
use crate::registry::Registry;
use crate::types::{QuitReason, Signal, UserId};
use crate::user::{Mailbox, User};

/// Reading side of one connection
pub struct Session {
    user_id: UserId,
    /// Name used in chat headers, kept in step with the registry
    name: String,
    registry: Registry,
    mailbox: Mailbox,
    queue: BroadcastSender,
    signals: mpsc::Sender<Signal>,
    closing: CancellationToken,
}

impl Session {
    pub fn new(
        user: &User,
        registry: Registry,
        queue: BroadcastSender,
        signals: mpsc::Sender<Signal>,
        closing: CancellationToken,
    ) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            registry,
            mailbox: user.mailbox.clone(),
            queue,
            signals,
            closing,
        }
    }

    /// Read and dispatch lines until the client leaves or the watchdog closes us
    pub async fn run<R>(mut self, mut lines: FramedRead<R, LinesCodec>)
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let next = tokio::select! {
                () = self.closing.cancelled() => {
                    debug!("Connection {} closing, session stopping", self.user_id);
                    return;
                }
                next = lines.next() => next,
            };

            let reason = match next {
                Some(Ok(line)) => {
                    if let Err(e) = self.dispatch(line).await {
                        warn!("Session {} ending: {}", self.user_id, e);
                        return;
                    }
                    if self.signals.send(Signal::Activity).await.is_err() {
                        return;
                    }
                    continue;
                }
                Some(Err(LinesCodecError::Io(e))) if e.kind() != ErrorKind::InvalidData => {
                    warn!("Read from {} failed: {}", self.user_id, e);
                    QuitReason::ReadFailed
                }
                Some(Err(e)) => {
                    warn!("Unframeable input from {}: {}", self.user_id, e);
                    self.reply(ServerMessage::from(&AppError::from(e)));
                    QuitReason::FramingFailed
                }
                None => {
                    info!("Client {} closed the connection", self.user_id);
                    QuitReason::ClientClosed
                }
            };

            let _ = self.signals.send(Signal::Quit(reason)).await;
            return;
        }
    }

    /// Handle one framed line
    ///
    /// Only a closed broadcast queue is an error here; protocol and
    /// registry errors are answered to the client and the session goes on.
    async fn dispatch(&mut self, line: String) -> Result<(), AppError> {
        debug!("Received from {}: {:?}", self.user_id, line);

        match Command::parse(&line) {
            Ok(Command::Who) => {
                self.reply(ServerMessage::Roster(self.registry.snapshot()));
            }
            Ok(Command::Rename(name)) => match self.registry.rename(self.user_id, &name) {
                Ok(()) => {
                    info!("User {} renamed '{}' -> '{}'", self.user_id, self.name, name);
                    self.name = name;
                    self.reply(ServerMessage::RenameAck);
                }
                Err(e) => {
                    warn!("Rename for {} failed: {}", self.user_id, e);
                    self.reply(ServerMessage::from(&e));
                }
            },
            Ok(Command::Chat(text)) => {
                let msg = ServerMessage::Chat {
                    from: self.user_id,
                    name: self.name.clone(),
                    text,
                };
                self.queue.send(msg).await.map_err(|_| AppError::QueueClosed)?;
            }
            Err(e) => {
                debug!("Protocol error from {}: {}", self.user_id, e);
                self.reply(ServerMessage::from(&e));
            }
        }

        Ok(())
    }

    fn reply(&self, msg: ServerMessage) {
        if let Err(e) = self.mailbox.deliver(msg) {
            warn!("Reply to {} dropped: {}", self.user_id, e);
        }
    }
}
