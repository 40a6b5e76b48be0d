//! Mailbox writer
//!
//! Drains a user's mailbox into the socket, one newline-terminated frame per
//! message, flushing after each so responses are never batched together.

use futures_util::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::types::{QuitReason, Signal, UserId};
use crate::user::MailboxReceiver;

/// Write mailbox messages to the client until the mailbox or connection closes
///
/// A failed write is reported to the watchdog; the writer never touches the
/// registry itself. Every write races the closing token, so a client that
/// stops reading cannot keep the connection open.
pub async fn run_writer<W>(
    user_id: UserId,
    mut mailbox: MailboxReceiver,
    mut sink: FramedWrite<W, LinesCodec>,
    signals: mpsc::Sender<Signal>,
    closing: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let msg = tokio::select! {
            biased;
            msg = mailbox.recv() => msg,
            () = closing.cancelled() => {
                debug!("Connection {} closing, writer stopping", user_id);
                break;
            }
        };

        let Some(msg) = msg else {
            debug!("Mailbox of {} closed", user_id);
            break;
        };

        let written = tokio::select! {
            written = sink.send(msg.to_string()) => written,
            () = closing.cancelled() => {
                debug!("Connection {} closing, pending write abandoned", user_id);
                break;
            }
        };

        if let Err(e) = written {
            warn!("Write to {} failed: {}", user_id, e);
            let _ = signals.send(Signal::Quit(QuitReason::WriteFailed)).await;
            break;
        }
    }

    // Flushing can block on a stalled peer too
    tokio::select! {
        _ = SinkExt::<String>::close(&mut sink) => {}
        () = closing.cancelled() => {}
    }
    debug!("Write task ended for {}", user_id);
}
