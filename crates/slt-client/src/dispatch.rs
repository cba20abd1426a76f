//! Inbound opcode routing.
//!
//! Only three opcodes mean anything to the client. Outbound-only opcodes
//! echoed back and opcodes this client does not speak route nowhere and are
//! dropped.

use crate::domain::OpCode;

/// Inbound handler selected for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// op 0
    Hello,
    /// op 2
    Identified,
    /// op 7
    RequestResponse,
}

/// Opcode → handler table.
const ROUTES: [(OpCode, Route); 3] = [
    (OpCode::Hello, Route::Hello),
    (OpCode::Identified, Route::Identified),
    (OpCode::RequestResponse, Route::RequestResponse),
];

/// Handler for raw opcode `op`, if any.
pub fn route(op: u8) -> Option<Route> {
    let op = OpCode::from_u8(op)?;
    ROUTES
        .iter()
        .find(|(candidate, _)| *candidate == op)
        .map(|(_, route)| *route)
}
