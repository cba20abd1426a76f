//! WebSocket transport over tokio-tungstenite.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use crate::domain::ClientError;
use crate::ports::{Connector, Transport, TransportCommand, TransportEvent};

/// Opens real WebSocket connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    /// Create a connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, address: &str) -> Result<Transport, ClientError> {
        let (ws_stream, _) = connect_async(address)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        debug!(address = address, "WebSocket connected");

        let (mut write, mut read) = ws_stream.split();
        let (outgoing, mut out_rx) = mpsc::unbounded_channel::<TransportCommand>();
        let (in_tx, incoming) = mpsc::unbounded_channel::<TransportEvent>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    command = out_rx.recv() => match command {
                        Some(TransportCommand::Text(text)) => {
                            if let Err(e) = write.send(Message::Text(text.into())).await {
                                let _ = in_tx.send(TransportEvent::Error(e.to_string()));
                                let _ = in_tx.send(TransportEvent::Closed);
                                break;
                            }
                        }
                        Some(TransportCommand::Close) | None => {
                            if let Err(e) = write.send(Message::Close(None)).await {
                                debug!(error = %e, "Close frame not sent");
                            }
                            let _ = in_tx.send(TransportEvent::Closed);
                            break;
                        }
                    },
                    message = read.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            if in_tx.send(TransportEvent::Text(text.as_str().to_owned())).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by server");
                            let _ = in_tx.send(TransportEvent::Closed);
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            let _ = in_tx.send(TransportEvent::Error(e.to_string()));
                            let _ = in_tx.send(TransportEvent::Closed);
                            break;
                        }
                        None => {
                            let _ = in_tx.send(TransportEvent::Closed);
                            break;
                        }
                    },
                }
            }
        });

        Ok(Transport { outgoing, incoming })
    }
}
