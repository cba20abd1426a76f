//! # Integration Scenarios
//!
//! Each test plays obs-websocket by hand through a [`MemoryPeer`] and
//! observes the client from the outside: returned results, the state
//! watch, and the event channel.

pub mod handshake_flows;

use std::sync::Arc;
use std::time::Duration;

use slt_client::{
    ClientConfig, ClientEvent, ConnectionManager, ConnectionStatus, MemoryConnector, MemoryPeer,
};
use tokio::sync::mpsc;

/// Address every harness connects to.
pub const TEST_ADDRESS: &str = "ws://127.0.0.1:4455";

/// A client wired to an in-memory connector.
pub struct Harness {
    /// Client under test
    pub client: Arc<ConnectionManager>,
    /// Event stream of the client
    pub events: mpsc::Receiver<ClientEvent>,
    /// Connector, for open counts and refusals
    pub connector: Arc<MemoryConnector>,
    /// Server sides, one per opened transport
    pub peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl Harness {
    /// Harness over `config`.
    pub fn new(config: ClientConfig) -> Self {
        let (connector, peers) = MemoryConnector::new();
        let connector = Arc::new(connector);
        let (client, events) = ConnectionManager::new(config, connector.clone());
        Self {
            client: Arc::new(client),
            events,
            connector,
            peers,
        }
    }

    /// Harness that does not list on identify.
    pub fn quiet() -> Self {
        Self::new(ClientConfig {
            list_on_identify: false,
            ..Default::default()
        })
    }

    /// Connect and return the server side of the new transport.
    pub async fn open(&mut self, password: Option<&str>) -> MemoryPeer {
        self.client
            .connect(TEST_ADDRESS, password)
            .await
            .expect("valid address");
        self.peers.recv().await.expect("transport opened")
    }

    /// Connect, run an unauthenticated handshake and wait for readiness.
    pub async fn ready(&mut self) -> MemoryPeer {
        let mut peer = self.open(None).await;
        peer.handshake().await.expect("Identify sent");
        self.client
            .wait_until_ready(Duration::from_secs(1))
            .await
            .expect("identified");
        peer
    }

    /// Every event emitted so far.
    pub fn drain(&mut self) -> Vec<ClientEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    /// Events up to and including the first matching `predicate`, waiting
    /// up to a second. Empty if nothing matched.
    pub async fn collect_until<F>(&mut self, predicate: F) -> Vec<ClientEvent>
    where
        F: Fn(&ClientEvent) -> bool,
    {
        let mut seen = Vec::new();
        let wait = async {
            while let Some(event) = self.events.recv().await {
                let done = predicate(&event);
                seen.push(event);
                if done {
                    return true;
                }
            }
            false
        };
        match tokio::time::timeout(Duration::from_secs(1), wait).await {
            Ok(true) => seen,
            _ => Vec::new(),
        }
    }

    /// Next event matching `predicate`, waiting up to a second.
    pub async fn next_matching<F>(&mut self, predicate: F) -> Option<ClientEvent>
    where
        F: Fn(&ClientEvent) -> bool,
    {
        let wait = async {
            while let Some(event) = self.events.recv().await {
                if predicate(&event) {
                    return Some(event);
                }
            }
            None
        };
        tokio::time::timeout(Duration::from_secs(1), wait)
            .await
            .ok()
            .flatten()
    }
}

/// Status values in `events`, in order.
pub fn statuses(events: &[ClientEvent]) -> Vec<ConnectionStatus> {
    events
        .iter()
        .filter_map(|event| match event {
            ClientEvent::Status(status) => Some(*status),
            _ => None,
        })
        .collect()
}

/// Notice texts in `events`, in order.
pub fn notices(events: &[ClientEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ClientEvent::Notice(text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}
