//! # Adapters
//!
//! Transport implementations of the outbound port.

pub mod memory;
pub mod ws;

pub use memory::{MemoryConnector, MemoryPeer};
pub use ws::WsConnector;
