//! Handshake state machine.
//!
//! Pure transition logic: callers feed it transport and protocol events and
//! send whatever it returns. Events that do not apply to the current state
//! are ignored rather than treated as errors, so unrelated protocol traffic
//! cannot break the handshake.
//!
//! ```text
//! Disconnected ─connect─> Connecting ─open─> SocketOpen ─read─> AwaitingHello
//!                                                                    │ Hello
//!                                                                    ↓
//!                              Identified <─Identified─ Identifying
//!
//! any state ─close─> Disconnected
//! ```

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{compute_token, AuthChallenge, Hello, Identify, EVENT_SUBSCRIPTION_NONE};

/// Handshake states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// No transport.
    Disconnected,
    /// Transport open requested.
    Connecting,
    /// Transport open.
    SocketOpen,
    /// Reading, Hello not yet seen.
    AwaitingHello,
    /// Identify sent.
    Identifying,
    /// Ready for requests.
    Identified,
}

/// A lifecycle transition requested from the wrong state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid handshake transition: {event} from {from:?}")]
pub struct TransitionError {
    /// State at the time of the request
    pub from: HandshakeState,
    /// Requested transition
    pub event: &'static str,
}

/// Hello → Identify → Identified driver for one connection.
#[derive(Debug, Clone)]
pub struct HandshakeStateMachine {
    state: HandshakeState,
    rpc_version_fallback: u32,
    negotiated_rpc_version: Option<u32>,
}

impl HandshakeStateMachine {
    /// New machine in `Disconnected`.
    pub fn new(rpc_version_fallback: u32) -> Self {
        Self {
            state: HandshakeState::Disconnected,
            rpc_version_fallback,
            negotiated_rpc_version: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Whether requests may be issued.
    pub fn is_ready(&self) -> bool {
        self.state == HandshakeState::Identified
    }

    /// RPC version from the Identified ack, if the server sent one.
    pub fn negotiated_rpc_version(&self) -> Option<u32> {
        self.negotiated_rpc_version
    }

    /// Transport open requested.
    pub fn begin_connect(&mut self) -> Result<(), TransitionError> {
        self.advance(HandshakeState::Disconnected, HandshakeState::Connecting, "connect")
    }

    /// Transport reported open.
    pub fn socket_opened(&mut self) -> Result<(), TransitionError> {
        self.advance(HandshakeState::Connecting, HandshakeState::SocketOpen, "socket_open")
    }

    /// Inbound reading started.
    pub fn await_hello(&mut self) -> Result<(), TransitionError> {
        self.advance(HandshakeState::SocketOpen, HandshakeState::AwaitingHello, "await_hello")
    }

    /// Handle a Hello. Returns the Identify to send, or `None` if a Hello is
    /// not expected in the current state.
    ///
    /// A token is computed only when the Hello carries a challenge and a
    /// non-empty password is available. Without a password the Identify goes
    /// out unauthenticated and the server's close reports the rejection.
    pub fn on_hello(&mut self, hello: Hello, password: Option<&str>) -> Option<Identify> {
        if !matches!(
            self.state,
            HandshakeState::SocketOpen | HandshakeState::AwaitingHello
        ) {
            debug!(state = ?self.state, "Ignoring Hello outside handshake");
            return None;
        }

        let password = password.filter(|p| !p.is_empty());
        let authentication = match (hello.authentication.map(AuthChallenge::from), password) {
            (Some(auth), Some(password)) => {
                Some(compute_token(password, &auth.salt, &auth.challenge))
            }
            (Some(_), None) => {
                warn!("Server requires authentication but no password is set");
                None
            }
            (None, _) => None,
        };

        self.state = HandshakeState::Identifying;

        Some(Identify {
            rpc_version: hello.rpc_version.unwrap_or(self.rpc_version_fallback),
            event_subscriptions: EVENT_SUBSCRIPTION_NONE,
            authentication,
        })
    }

    /// Handle an Identified ack. Returns `true` if the session just became
    /// ready.
    pub fn on_identified(&mut self, negotiated_rpc_version: Option<u32>) -> bool {
        if self.state != HandshakeState::Identifying {
            debug!(state = ?self.state, "Ignoring Identified outside handshake");
            return false;
        }
        self.state = HandshakeState::Identified;
        self.negotiated_rpc_version = negotiated_rpc_version;
        true
    }

    /// Transport closed.
    pub fn on_close(&mut self) {
        self.state = HandshakeState::Disconnected;
        self.negotiated_rpc_version = None;
    }

    fn advance(
        &mut self,
        from: HandshakeState,
        to: HandshakeState,
        event: &'static str,
    ) -> Result<(), TransitionError> {
        if self.state != from {
            return Err(TransitionError {
                from: self.state,
                event,
            });
        }
        self.state = to;
        Ok(())
    }
}
