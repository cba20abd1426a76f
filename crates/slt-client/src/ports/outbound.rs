//! # Outbound Ports (Driven Ports / SPI)
//!
//! The socket the session runs over. A transport is a pair of channels so
//! the session can `select!` on it alongside its own timers and commands.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::ClientError;

/// Session → transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Send one text frame.
    Text(String),
    /// Close the socket.
    Close,
}

/// Transport → session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One inbound text frame.
    Text(String),
    /// Socket closed, by either side.
    Closed,
    /// Socket failed. The text is for logs only; the underlying APIs do not
    /// give anything a caller could act on.
    Error(String),
}

/// An open socket.
#[derive(Debug)]
pub struct Transport {
    /// Outgoing frames.
    pub outgoing: mpsc::UnboundedSender<TransportCommand>,
    /// Incoming frames. Ends (yields `None`) once the socket is gone.
    pub incoming: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a socket to `address`.
    ///
    /// # Errors
    /// * `ClientError::Connection` - the socket could not be opened
    async fn open(&self, address: &str) -> Result<Transport, ClientError>;
}
