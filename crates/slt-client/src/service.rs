//! # Connection Manager
//!
//! Front door of the client. Owns at most one session at a time and exposes
//! connect / disconnect / request to the operator front-end.
//!
//! ```text
//! front-end ──connect()──> ConnectionManager ──spawn──> Session task
//!     ↑                         │  request()                 │
//!     │                         └──── SessionCommand ───────>│
//!     └──────── ClientEvent (status, log, items) ────────────┘
//! ```
//!
//! `connect()` returns as soon as the session is spawned; readiness arrives
//! later as `ConnectionStatus::Identified` on the event channel (or via
//! `wait_until_ready()`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::adapters::WsConnector;
use crate::domain::{
    normalize_items, validate_address, ClientConfig, ClientError, ClientEvent, LowerThird,
    LowerThirdsRequest, RequestIdGenerator, RequestResponse, VendorCall, CALL_VENDOR_REQUEST,
};
use crate::handshake::HandshakeState;
use crate::ports::{Connector, LowerThirdsApi};
use crate::session::{Session, SessionCommand, SessionSinks};

/// Handle to the live session task.
struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    task: JoinHandle<()>,
}

/// Owns the connection to obs-websocket.
pub struct ConnectionManager {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    ids: Arc<RequestIdGenerator>,
    sinks: SessionSinks,
    session: Mutex<Option<SessionHandle>>,
}

impl ConnectionManager {
    /// Create a manager over `connector`, returning the event stream for the
    /// front-end.
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
    ) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (events, event_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let (state, _) = watch::channel(HandshakeState::Disconnected);

        let manager = Self {
            config,
            connector,
            ids: Arc::new(RequestIdGenerator::new()),
            sinks: SessionSinks {
                events,
                state: Arc::new(state),
            },
            session: Mutex::new(None),
        };
        (manager, event_rx)
    }

    /// Create a manager over real WebSockets.
    pub fn with_websocket(config: ClientConfig) -> (Self, mpsc::Receiver<ClientEvent>) {
        Self::new(config, Arc::new(WsConnector::new()))
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Tear down any current session and start a new one to `address`.
    ///
    /// Returns once the new session is spawned, not once it is ready.
    ///
    /// # Errors
    /// * `ClientError::InvalidAddress` - `address` is not a ws/wss URL; no
    ///   socket is opened and the previous session is left alone
    pub async fn connect(&self, address: &str, password: Option<&str>) -> Result<(), ClientError> {
        let url = validate_address(address)?;

        let mut session = self.session.lock().await;
        if let Some(previous) = session.take() {
            debug!("Replacing existing session");
            shutdown(previous).await;
        }

        info!(address = %url, "Connecting");

        let (commands, command_rx) = mpsc::unbounded_channel();
        let new_session = Session::new(
            address.to_string(),
            password.map(str::to_string),
            self.config.clone(),
            Arc::clone(&self.connector),
            Arc::clone(&self.ids),
            self.sinks.clone(),
        );
        let task = tokio::spawn(new_session.run(command_rx));

        *session = Some(SessionHandle { commands, task });
        Ok(())
    }

    /// Connect using the configured address and password.
    pub async fn connect_configured(&self) -> Result<(), ClientError> {
        let address = self.config.address.clone();
        let password = self.config.effective_password().map(str::to_string);
        self.connect(&address, password.as_deref()).await
    }

    /// Close the current session, if any. Idempotent.
    ///
    /// Pending requests are rejected with `ClientError::Disconnected` before
    /// this returns.
    pub async fn disconnect(&self) {
        let previous = self.session.lock().await.take();
        match previous {
            Some(handle) => shutdown(handle).await,
            None => debug!("Disconnect with no session"),
        }
    }

    /// Current handshake state.
    pub fn state(&self) -> HandshakeState {
        *self.sinks.state.borrow()
    }

    /// Whether requests may be issued.
    pub fn is_ready(&self) -> bool {
        self.state() == HandshakeState::Identified
    }

    /// Watch handshake state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<HandshakeState> {
        self.sinks.state.subscribe()
    }

    /// Wait until the session is identified.
    ///
    /// # Errors
    /// * `ClientError::Connection` - the session closed first, there is no
    ///   session, or `timeout` elapsed
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<(), ClientError> {
        let mut state = self.subscribe_state();
        let wait = async move {
            loop {
                match *state.borrow_and_update() {
                    HandshakeState::Identified => return Ok(()),
                    HandshakeState::Disconnected => {
                        return Err(ClientError::Connection(
                            "connection closed before identification".into(),
                        ))
                    }
                    _ => {}
                }
                if state.changed().await.is_err() {
                    return Err(ClientError::Connection("client dropped".into()));
                }
            }
        };

        tokio::time::timeout(timeout, wait).await.map_err(|_| {
            ClientError::Connection(format!("not identified within {timeout:?}"))
        })?
    }

    /// Issue a raw request.
    ///
    /// # Errors
    /// * `ClientError::NotReady` - not identified; nothing is sent
    /// * `ClientError::RequestTimeout` - no response in time
    /// * `ClientError::RequestFailed` - failure status from the server
    /// * `ClientError::Disconnected` - the socket closed first
    pub async fn request(
        &self,
        request_type: &str,
        request_data: Value,
    ) -> Result<RequestResponse, ClientError> {
        if !self.is_ready() {
            return Err(ClientError::NotReady);
        }

        let commands = match self.session.lock().await.as_ref() {
            Some(handle) => handle.commands.clone(),
            None => return Err(ClientError::NotReady),
        };

        let (reply, response) = oneshot::channel();
        commands
            .send(SessionCommand::Request {
                request_type: request_type.to_string(),
                request_data,
                reply,
            })
            .map_err(|_| ClientError::NotReady)?;

        response.await.map_err(|_| ClientError::Disconnected {
            request_type: request_type.to_string(),
        })?
    }

    /// Issue a vendor call to the configured vendor.
    ///
    /// # Errors
    /// Same as [`ConnectionManager::request`]; fails with `NotReady` before
    /// building anything when not identified.
    pub async fn call_vendor_raw(
        &self,
        request_type: &str,
        request_data: Value,
    ) -> Result<RequestResponse, ClientError> {
        if !self.is_ready() {
            return Err(ClientError::NotReady);
        }
        let data = VendorCall::new(&self.config.vendor_name, request_type, request_data)
            .into_request_data()?;
        self.request(CALL_VENDOR_REQUEST, data).await
    }

    async fn lower_thirds(&self, call: LowerThirdsRequest) -> Result<RequestResponse, ClientError> {
        self.call_vendor_raw(call.request_type(), call.request_data())
            .await
    }
}

#[async_trait]
impl LowerThirdsApi for ConnectionManager {
    async fn request(
        &self,
        request_type: &str,
        request_data: Value,
    ) -> Result<RequestResponse, ClientError> {
        ConnectionManager::request(self, request_type, request_data).await
    }

    async fn call_vendor(
        &self,
        request_type: &str,
        request_data: Value,
    ) -> Result<RequestResponse, ClientError> {
        self.call_vendor_raw(request_type, request_data).await
    }

    async fn list_lower_thirds(&self) -> Result<Vec<LowerThird>, ClientError> {
        let response = self.lower_thirds(LowerThirdsRequest::List).await?;
        Ok(normalize_items(&response))
    }

    async fn toggle_visible(&self, id: &str) -> Result<RequestResponse, ClientError> {
        self.lower_thirds(LowerThirdsRequest::ToggleVisible { id: id.to_string() })
            .await
    }

    async fn set_visible(&self, id: &str, visible: bool) -> Result<RequestResponse, ClientError> {
        self.lower_thirds(LowerThirdsRequest::SetVisible {
            id: id.to_string(),
            visible,
        })
        .await
    }
}

async fn shutdown(handle: SessionHandle) {
    let _ = handle.commands.send(SessionCommand::Disconnect);
    if let Err(e) = handle.task.await {
        debug!(error = %e, "Session task ended abnormally");
    }
}
