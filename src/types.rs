//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `UserId`: peer-address based user identifier
//! - `Signal`: session/writer → watchdog notifications
//! - `Teardown`: the reason a connection was torn down

use std::net::SocketAddr;

/// Unique user identifier (newtype pattern)
///
/// Wraps the peer address of the connection. It never changes for the
/// lifetime of a connection and is unique among live connections.
/// Ordered so roster snapshots come out in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub SocketAddr);

impl From<SocketAddr> for UserId {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a connection asked its watchdog to end it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitReason {
    /// Client closed its end (zero-length read)
    ClientClosed,
    /// Reading from the socket failed
    ReadFailed,
    /// The byte stream could not be framed into lines
    FramingFailed,
    /// Writing to the socket failed
    WriteFailed,
}

/// Notifications sent to a connection's watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The client did something; restart the idle window
    Activity,
    /// The connection should end
    Quit(QuitReason),
}

/// How a connection ended, as decided by its watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    Quit(QuitReason),
    /// Session and writer both went away without a quit signal
    Abandoned,
    IdleTimeout,
    ServerShutdown,
}

impl Teardown {
    /// True if the user left because of inactivity
    pub fn is_timeout(&self) -> bool {
        matches!(self, Teardown::IdleTimeout)
    }
}
