//! Session task - one live connection.
//!
//! The task owns the transport, the handshake machine and the pending
//! table, and handles one event at a time: a caller command, an inbound
//! frame, or a timer expiry. Nothing else touches that state, so response
//! and timeout can never both settle the same request.
//!
//! Close policy: when the socket closes for any reason, every request
//! still pending is rejected with `ClientError::Disconnected` right away
//! instead of waiting out its timeout.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::correlator::{Completion, Outcome, RequestCorrelator, RequestResult};
use crate::dispatch::{route, Route};
use crate::domain::{
    normalize_items, ClientConfig, ClientError, ClientEvent, ConnectionStatus, Envelope,
    Identified, Hello, LowerThirdsRequest, OpCode, RequestIdGenerator, RequestResponse,
    CALL_VENDOR_REQUEST,
};
use crate::handshake::{HandshakeState, HandshakeStateMachine};
use crate::ports::{Connector, Transport, TransportCommand, TransportEvent};

/// Caller → session.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    /// Issue a request once identified.
    Request {
        request_type: String,
        request_data: Value,
        reply: oneshot::Sender<RequestResult>,
    },
    /// Close the socket and end the session.
    Disconnect,
}

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    Local,
    Remote,
}

/// Shared sinks a session reports through.
#[derive(Clone)]
pub(crate) struct SessionSinks {
    pub events: mpsc::Sender<ClientEvent>,
    pub state: Arc<watch::Sender<HandshakeState>>,
}

impl SessionSinks {
    /// Deliver an event without ever blocking the session.
    pub fn emit(&self, event: ClientEvent) {
        if let Err(e) = self.events.try_send(event) {
            debug!(error = %e, "Client event dropped");
        }
    }

    fn log(&self, line: impl Into<String>) {
        self.emit(ClientEvent::Log(line.into()));
    }

    fn status(&self, status: ConnectionStatus) {
        info!(status = ?status, "{}", status);
        self.emit(ClientEvent::Status(status));
    }
}

/// One connection attempt and its lifetime.
pub(crate) struct Session {
    address: String,
    password: Option<String>,
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    handshake: HandshakeStateMachine,
    correlator: RequestCorrelator,
    expiries: mpsc::UnboundedReceiver<String>,
    sinks: SessionSinks,
}

impl Session {
    /// Create a session already in `Connecting`.
    pub fn new(
        address: String,
        password: Option<String>,
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        ids: Arc<RequestIdGenerator>,
        sinks: SessionSinks,
    ) -> Self {
        let (correlator, expiries) = RequestCorrelator::new(ids, config.request_timeout);
        let mut handshake = HandshakeStateMachine::new(config.rpc_version);
        if let Err(e) = handshake.begin_connect() {
            warn!(error = %e, "Fresh handshake refused connect");
        }

        let session = Self {
            address,
            password: password.filter(|p| !p.is_empty()),
            config,
            connector,
            handshake,
            correlator,
            expiries,
            sinks,
        };
        session.publish_state();
        session.sinks.status(ConnectionStatus::Connecting);
        session
    }

    /// Drive the session until the socket closes.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        let connector = Arc::clone(&self.connector);
        let address = self.address.clone();
        let open = connector.open(&address);
        tokio::pin!(open);

        let opened = loop {
            tokio::select! {
                result = &mut open => break Some(result),
                command = commands.recv() => match command {
                    Some(SessionCommand::Request { reply, .. }) => {
                        let _ = reply.send(Err(ClientError::NotReady));
                    }
                    Some(SessionCommand::Disconnect) | None => break None,
                },
            }
        };

        let mut transport = match opened {
            None => {
                debug!(address = %self.address, "Disconnect requested while connecting");
                self.finish(CloseReason::Local);
                return;
            }
            Some(Ok(transport)) => transport,
            Some(Err(e)) => {
                warn!(address = %self.address, error = %e, "Transport open failed");
                self.sinks.log(format!("Connect failed: {e}"));
                self.sinks.status(ConnectionStatus::Error);
                self.finish(CloseReason::Remote);
                return;
            }
        };

        self.advance(HandshakeStateMachine::socket_opened);
        self.sinks.status(ConnectionStatus::SocketOpen);
        self.advance(HandshakeStateMachine::await_hello);

        let reason = loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Request { request_type, request_data, reply }) => {
                        self.on_request(&transport, request_type, request_data, reply);
                    }
                    Some(SessionCommand::Disconnect) | None => {
                        let _ = transport.outgoing.send(TransportCommand::Close);
                        break CloseReason::Local;
                    }
                },
                event = transport.incoming.recv() => match event {
                    Some(TransportEvent::Text(text)) => self.on_text(&transport, &text),
                    Some(TransportEvent::Error(detail)) => {
                        warn!(error = %detail, "Transport error");
                        self.sinks.log("WebSocket error event (transport provides no detail).");
                    }
                    Some(TransportEvent::Closed) | None => break CloseReason::Remote,
                },
                Some(request_id) = self.expiries.recv() => {
                    let outcome = self.correlator.expire(&request_id);
                    self.on_outcome(outcome);
                }
            }
        };

        self.finish(reason);
    }

    fn on_request(
        &mut self,
        transport: &Transport,
        request_type: String,
        request_data: Value,
        reply: oneshot::Sender<RequestResult>,
    ) {
        if !self.handshake.is_ready() {
            let _ = reply.send(Err(ClientError::NotReady));
            return;
        }
        self.issue(transport, &request_type, request_data, Completion::Caller(reply));
    }

    fn issue(
        &mut self,
        transport: &Transport,
        request_type: &str,
        request_data: Value,
        completion: Completion,
    ) {
        match self.correlator.issue(request_type, request_data, completion) {
            Ok((_, envelope)) => self.send(transport, &envelope),
            Err(e) => warn!(request_type = request_type, error = %e, "Request not issued"),
        }
    }

    fn on_text(&mut self, transport: &Transport, text: &str) {
        let Some(envelope) = Envelope::parse(text) else {
            debug!("Dropping non-protocol frame");
            self.sinks.log(format!("<< (ignored) {text}"));
            return;
        };
        let Some(route) = route(envelope.op) else {
            debug!(op = envelope.op, "Dropping unrouted opcode");
            self.sinks.log(format!("<< (ignored op {}) {text}", envelope.op));
            return;
        };

        self.sinks.log(format!("<< {text}"));

        match route {
            Route::Hello => self.on_hello(transport, &envelope),
            Route::Identified => self.on_identified(transport, &envelope),
            Route::RequestResponse => self.on_response(&envelope),
        }
    }

    fn on_hello(&mut self, transport: &Transport, envelope: &Envelope) {
        let hello: Hello = match envelope.payload() {
            Ok(hello) => hello,
            Err(e) => {
                debug!(error = %e, "Dropping malformed Hello");
                return;
            }
        };

        let challenged = hello.authentication.is_some();
        let Some(identify) = self.handshake.on_hello(hello, self.password.as_deref()) else {
            return;
        };
        self.publish_state();

        match Envelope::new(OpCode::Identify, &identify) {
            Ok(envelope) => {
                debug!(
                    challenged = challenged,
                    authenticated = identify.authentication.is_some(),
                    rpc_version = identify.rpc_version,
                    "Sending Identify"
                );
                self.send(transport, &envelope);
                self.sinks.status(ConnectionStatus::Identifying);
            }
            Err(e) => warn!(error = %e, "Identify not encoded"),
        }
    }

    fn on_identified(&mut self, transport: &Transport, envelope: &Envelope) {
        let ack: Identified = envelope.payload().unwrap_or_default();
        if !self.handshake.on_identified(ack.negotiated_rpc_version) {
            return;
        }
        self.publish_state();
        self.sinks.status(ConnectionStatus::Identified);

        if self.config.list_on_identify {
            self.sinks.emit(ClientEvent::Notice("Listing lower thirds…".into()));
            let call = LowerThirdsRequest::List.to_vendor_call(&self.config.vendor_name);
            match call.into_request_data() {
                Ok(data) => self.issue(transport, CALL_VENDOR_REQUEST, data, Completion::Listing),
                Err(e) => warn!(error = %e, "Listing not encoded"),
            }
        }
    }

    fn on_response(&mut self, envelope: &Envelope) {
        let response: RequestResponse = match envelope.payload() {
            Ok(response) => response,
            Err(e) => match RequestResponse::undecodable(&envelope.d) {
                Some(response) => {
                    debug!(error = %e, request_id = %response.request_id, "Malformed RequestResponse settles as failure");
                    response
                }
                None => {
                    debug!(error = %e, "Dropping malformed RequestResponse");
                    return;
                }
            },
        };
        let outcome = self.correlator.complete(response);
        self.on_outcome(outcome);
    }

    fn on_outcome(&self, outcome: Outcome) {
        let Outcome::Listing(result) = outcome else {
            return;
        };
        match result {
            Ok(response) => {
                let items = normalize_items(&response);
                self.sinks
                    .log(format!("ListLowerThirds: {}", response.response_data));
                let count = items.len();
                self.sinks.emit(ClientEvent::Items(items));
                self.sinks
                    .emit(ClientEvent::Notice(format!("Listed {count} item(s).")));
            }
            Err(e) => {
                self.sinks.log(format!("List error: {e}"));
                self.sinks
                    .emit(ClientEvent::Notice("List failed (see log).".into()));
            }
        }
    }

    fn send(&self, transport: &Transport, envelope: &Envelope) {
        let text = match envelope.to_text() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Frame not encoded");
                return;
            }
        };

        if envelope.opcode() == Some(OpCode::Identify) {
            self.sinks.log(">> Identify");
        } else {
            self.sinks.log(format!(">> {text}"));
        }

        if transport.outgoing.send(TransportCommand::Text(text)).is_err() {
            debug!("Transport gone, frame not sent");
        }
    }

    fn finish(&mut self, reason: CloseReason) {
        self.handshake.on_close();
        for outcome in self.correlator.reject_all() {
            self.on_outcome(outcome);
        }
        self.publish_state();

        let stats = self.correlator.stats();
        info!(
            reason = ?reason,
            issued = stats.issued,
            completed = stats.completed,
            failed = stats.failed,
            timed_out = stats.timed_out,
            rejected = stats.rejected,
            "Session closed"
        );
        self.sinks.status(ConnectionStatus::Disconnected);
    }

    fn advance<F, E>(&mut self, transition: F)
    where
        F: FnOnce(&mut HandshakeStateMachine) -> Result<(), E>,
        E: std::fmt::Display,
    {
        if let Err(e) = transition(&mut self.handshake) {
            warn!(error = %e, "Handshake transition refused");
        }
        self.publish_state();
    }

    fn publish_state(&self) {
        self.sinks.state.send_replace(self.handshake.state());
    }
}
