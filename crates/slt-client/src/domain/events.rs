//! Events delivered to the operator front-end.

use std::fmt;

use super::items::LowerThird;

/// Connection-level status notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Transport open in progress.
    Connecting,
    /// Transport open, Hello not yet received.
    SocketOpen,
    /// Identify sent.
    Identifying,
    /// Session ready for requests.
    Identified,
    /// Transport closed (locally, remotely, or rejected credentials).
    Disconnected,
    /// Transport could not be opened or failed.
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Connecting => "Connecting…",
            Self::SocketOpen => "Socket open. Waiting for Hello…",
            Self::Identifying => "Sent Identify…",
            Self::Identified => "Connected & Identified.",
            Self::Disconnected => "Disconnected.",
            Self::Error => "Connect failed (see log).",
        };
        f.write_str(text)
    }
}

/// Events received by the front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Connection state transition.
    Status(ConnectionStatus),
    /// Free-form progress text ("Listed 3 item(s).").
    Notice(String),
    /// Diagnostic log line.
    Log(String),
    /// Result of an automatic listing.
    Items(Vec<LowerThird>),
}
