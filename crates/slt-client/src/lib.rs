//! SLT Client - obs-websocket v5 client core for the Smart Lower Thirds
//! vendor plugin.
//!
//! Opens a WebSocket to OBS, completes the Hello/Identify handshake
//! (answering the SHA-256 challenge when a password is set), then issues
//! correlated requests and wraps lower-third operations in
//! `CallVendorRequest`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         slt-client                               │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  LowerThirdsApi (inbound port)                                   │
//! │        │                                                         │
//! │  ConnectionManager ──spawn──> Session task                       │
//! │                                 │                                │
//! │          ┌──────────────────────┼─────────────────────┐          │
//! │          ▼                      ▼                     ▼          │
//! │  HandshakeStateMachine   RequestCorrelator      dispatch::route  │
//! │  (Hello → Identify)      (id → pending, timer)  (opcode table)   │
//! │                                 │                                │
//! │  Connector (outbound port): WsConnector | MemoryConnector        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use slt_client::{ClientConfig, ConnectionManager, LowerThirdsApi};
//!
//! let (client, mut events) = ConnectionManager::with_websocket(ClientConfig::from_env());
//! client.connect_configured().await?;
//! client.wait_until_ready(Duration::from_secs(5)).await?;
//! let items = client.list_lower_thirds().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod correlator;
pub mod dispatch;
pub mod domain;
pub mod handshake;
pub mod ports;
pub mod service;

mod session;

// Re-exports for public API
pub use adapters::{MemoryConnector, MemoryPeer, WsConnector};
pub use correlator::{CorrelatorStats, RequestCorrelator};
pub use domain::*;
pub use handshake::{HandshakeState, HandshakeStateMachine};
pub use ports::{Connector, LowerThirdsApi, Transport, TransportCommand, TransportEvent};
pub use service::ConnectionManager;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
