//! In-process transport.
//!
//! Every `open()` hands the server side of a fresh loopback socket to the
//! test as a [`MemoryPeer`], which then plays obs-websocket by hand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::domain::{ClientError, Envelope, Identify, OpCode, Request};
use crate::ports::{Connector, Transport, TransportCommand, TransportEvent};

/// Loopback connector.
#[derive(Debug)]
pub struct MemoryConnector {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    refuse_next: AtomicBool,
    opened: AtomicUsize,
}

impl MemoryConnector {
    /// Create a connector and the stream of server sides it produces.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peers, peer_rx) = mpsc::unbounded_channel();
        let connector = Self {
            peers,
            refuse_next: AtomicBool::new(false),
            opened: AtomicUsize::new(0),
        };
        (connector, peer_rx)
    }

    /// Make the next `open()` fail.
    pub fn refuse_next(&self) {
        self.refuse_next.store(true, Ordering::SeqCst);
    }

    /// Transports opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, address: &str) -> Result<Transport, ClientError> {
        if self.refuse_next.swap(false, Ordering::SeqCst) {
            return Err(ClientError::Connection("connection refused".into()));
        }

        let (outgoing, from_client) = mpsc::unbounded_channel();
        let (to_client, incoming) = mpsc::unbounded_channel();

        self.peers
            .send(MemoryPeer {
                address: address.to_string(),
                from_client,
                to_client,
            })
            .map_err(|_| ClientError::Connection("no listener".into()))?;
        self.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Transport { outgoing, incoming })
    }
}

/// Server side of a loopback socket.
#[derive(Debug)]
pub struct MemoryPeer {
    /// Address the client asked for.
    pub address: String,
    from_client: mpsc::UnboundedReceiver<TransportCommand>,
    to_client: mpsc::UnboundedSender<TransportEvent>,
}

impl MemoryPeer {
    /// Push a raw text frame to the client.
    pub fn send_text(&self, text: &str) {
        let _ = self.to_client.send(TransportEvent::Text(text.to_string()));
    }

    /// Push a JSON frame to the client.
    pub fn send_json(&self, value: &Value) {
        self.send_text(&value.to_string());
    }

    /// Send a Hello, optionally challenging with `(salt, challenge)`.
    pub fn send_hello(&self, authentication: Option<(&str, &str)>) {
        let mut d = json!({"obsWebSocketVersion": "5.5.0", "rpcVersion": 1});
        if let Some((salt, challenge)) = authentication {
            d["authentication"] = json!({"salt": salt, "challenge": challenge});
        }
        self.send_json(&json!({"op": OpCode::Hello.as_u8(), "d": d}));
    }

    /// Send an Identified ack.
    pub fn send_identified(&self) {
        self.send_json(&json!({"op": OpCode::Identified.as_u8(), "d": {"negotiatedRpcVersion": 1}}));
    }

    /// Answer `request` with a status and body.
    pub fn respond(&self, request: &Request, result: bool, code: i64, response_data: Value) {
        self.send_json(&json!({
            "op": OpCode::RequestResponse.as_u8(),
            "d": {
                "requestType": request.request_type,
                "requestId": request.request_id,
                "requestStatus": {"result": result, "code": code},
                "responseData": response_data,
            }
        }));
    }

    /// Answer `request` with a failure status and comment.
    pub fn fail(&self, request: &Request, code: i64, comment: &str) {
        self.send_json(&json!({
            "op": OpCode::RequestResponse.as_u8(),
            "d": {
                "requestType": request.request_type,
                "requestId": request.request_id,
                "requestStatus": {"result": false, "code": code, "comment": comment},
            }
        }));
    }

    /// Report a socket error to the client.
    pub fn error(&self, detail: &str) {
        let _ = self.to_client.send(TransportEvent::Error(detail.to_string()));
    }

    /// Close the socket from the server side.
    pub fn close(&self) {
        let _ = self.to_client.send(TransportEvent::Closed);
    }

    /// Next command from the client; `None` once the client side is gone.
    pub async fn recv(&mut self) -> Option<TransportCommand> {
        self.from_client.recv().await
    }

    /// Next frame from the client, or `None` on close.
    pub async fn recv_envelope(&mut self) -> Option<Envelope> {
        match self.recv().await? {
            TransportCommand::Text(text) => Envelope::parse(&text),
            TransportCommand::Close => None,
        }
    }

    /// Next frame, which must be an Identify.
    pub async fn expect_identify(&mut self) -> Option<Identify> {
        let envelope = self.recv_envelope().await?;
        if envelope.opcode() != Some(OpCode::Identify) {
            return None;
        }
        envelope.payload().ok()
    }

    /// Next frame, which must be a Request.
    pub async fn expect_request(&mut self) -> Option<Request> {
        let envelope = self.recv_envelope().await?;
        if envelope.opcode() != Some(OpCode::Request) {
            return None;
        }
        envelope.payload().ok()
    }

    /// Run Hello → Identify → Identified without authentication.
    pub async fn handshake(&mut self) -> Option<Identify> {
        self.send_hello(None);
        let identify = self.expect_identify().await?;
        self.send_identified();
        Some(identify)
    }

    /// Non-blocking check for a pending client command.
    pub fn try_recv(&mut self) -> Option<TransportCommand> {
        self.from_client.try_recv().ok()
    }
}
