//! # Domain Module
//!
//! Pure protocol types and algorithms: no I/O, no tasks.

pub mod auth;
pub mod config;
pub mod errors;
pub mod events;
pub mod items;
pub mod messages;
pub mod request_id;
pub mod vendor;

pub use auth::*;
pub use config::*;
pub use errors::*;
pub use events::*;
pub use items::*;
pub use messages::*;
pub use request_id::*;
pub use vendor::*;
