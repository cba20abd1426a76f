//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API that the operator front-end uses
//! - **Outbound (Driven)**: The socket the client runs over

pub mod inbound;
pub mod outbound;

pub use inbound::LowerThirdsApi;
pub use outbound::{Connector, Transport, TransportCommand, TransportEvent};
