//! TCP connection handler
//!
//! Registers the user, wires up the per-connection tasks (session, mailbox
//! writer, watchdog) and waits for the watchdog to tear the connection down.

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::AppError;
use crate::message::ServerMessage;
use crate::server::ServerContext;
use crate::session::Session;
use crate::types::{Teardown, UserId};
use crate::user::mailbox;
use crate::watchdog::Watchdog;
use crate::writer::run_writer;

/// Buffer size for session/writer → watchdog signals
const SIGNAL_BUFFER_SIZE: usize = 16;

/// Handle a new TCP connection
///
/// Returns once the connection is gone, with the reason the watchdog
/// decided on.
pub async fn handle_connection(
    stream: TcpStream,
    ctx: ServerContext,
) -> Result<Teardown, AppError> {
    let peer_addr = stream.peer_addr()?;
    let user_id = UserId::from(peer_addr);
    debug!("New TCP connection from {}", peer_addr);

    let (read_half, write_half) = stream.into_split();

    // Register before announcing so the newcomer sees its own login
    let (mailbox_tx, mailbox_rx) = mailbox(ctx.config.mailbox_capacity);
    let user = ctx
        .registry
        .register(user_id, user_id.to_string(), mailbox_tx)?;
    info!("User {} connected", user_id);

    // Queued before the watchdog exists, so a logout can never overtake it
    let login = ServerMessage::Login {
        id: user_id,
        name: user.name.clone(),
    };
    if ctx.queue.send(login).await.is_err() {
        debug!("Broadcast queue closed, login of {} not announced", user_id);
    }

    let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_BUFFER_SIZE);
    let closing = CancellationToken::new();

    let watchdog = Watchdog::new(
        user_id,
        ctx.registry.clone(),
        ctx.queue.clone(),
        signal_rx,
        closing.clone(),
        ctx.shutdown.clone(),
        ctx.config.idle_timeout(),
    );
    let watchdog_task = tokio::spawn(watchdog.run());

    let codec = LinesCodec::new_with_max_length(ctx.config.max_line_length);
    let write_task = tokio::spawn(run_writer(
        user_id,
        mailbox_rx,
        FramedWrite::new(write_half, codec.clone()),
        signal_tx.clone(),
        closing.clone(),
    ));

    let session = Session::new(
        &user,
        ctx.registry.clone(),
        ctx.queue.clone(),
        signal_tx,
        closing,
    );
    session.run(FramedRead::new(read_half, codec)).await;

    let teardown = watchdog_task.await?;
    write_task.await?;

    info!("User {} disconnected ({:?})", user_id, teardown);
    Ok(teardown)
}
