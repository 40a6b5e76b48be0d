//! Group Chat Server Library
//!
//! A multi-client TCP chat server: every connected user shares one room,
//! chat lines are fanned out to everyone, and idle users are evicted.
//!
//! # Features
//! - Newline-delimited text protocol
//! - Roster query (`\who`)
//! - Display name changes (`\rename|<name>`)
//! - Login/logout announcements
//! - Idle timeout eviction
//!
//! # Architecture
//! - `Registry` is the mutex-guarded directory of connected users
//! - `Distributor` is the single consumer of the global broadcast queue and
//!   pushes each message into every user's bounded mailbox
//! - Each connection runs a `Session` (reads and dispatches), a mailbox
//!   writer (drains the mailbox to the socket) and a `Watchdog`
//! - The watchdog is the only task that removes a user and closes a
//!   connection
//!
//! # Example
//! ```ignore
//! use group_chat::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), group_chat::AppError> {
//!     let server = Server::bind(Config::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod config;
pub mod distributor;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;
pub mod user;
pub mod watchdog;
pub mod writer;

// Re-export main types for convenience
pub use config::Config;
pub use distributor::{Distributor, FanoutReport};
pub use error::{AppError, DeliveryError};
pub use handler::handle_connection;
pub use message::{Command, ServerMessage};
pub use registry::Registry;
pub use server::{Server, ServerContext};
pub use session::Session;
pub use types::{QuitReason, Signal, Teardown, UserId};
pub use user::{Mailbox, User};
pub use watchdog::Watchdog;
