//! # WebSocket Transport for Presence
//!
//! Network layer carrying the presence RPC surface: `subscribe` (server push
//! of the session's event stream), `set_status`, and `get_presence`, one
//! JSON message per text frame.
//!
//! Client errors (bad status value, malformed request) are answered on the
//! same connection and leave the session live; transport failures are fatal
//! to their own session only and surface to peers as the resulting
//! `user_left` broadcast.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message},
    WebSocketStream,
};

use crate::presence::{
    ClientId, ClientInfo, ClientRegistry, ClientStatus, PresenceError, PresenceEvent,
    PresenceResult, SubscriptionSession,
};

use super::config::ServerConfig;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Request from a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open the presence subscription on this connection
    Subscribe,

    /// Set a client's status
    #[serde(rename_all = "camelCase")]
    SetStatus { client_id: String, status: String },

    /// One-shot roster snapshot
    GetPresence,
}

/// Message to a client.
///
/// Untagged: each variant serializes to exactly the wire shape consumers
/// rely on (presence events keep their own `_tag`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// A presence event on the subscription stream
    Event(PresenceEvent),

    /// Reply to `set_status`
    SetStatusResult { success: bool },

    /// Reply to `get_presence`
    Presence { clients: Vec<ClientInfo> },

    /// Client error report
    Error { message: String, code: String },
}

/// WebSocket server owning the registry and the accept loop.
pub struct PresenceServer {
    config: ServerConfig,
    registry: Arc<ClientRegistry>,
    shutdown_tx: broadcast::Sender<()>,
}

impl PresenceServer {
    /// Create a server from configuration.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let registry = Arc::new(ClientRegistry::new(config.bus_capacity));

        Self {
            config,
            registry,
            shutdown_tx,
        }
    }

    /// The shared registry.
    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.registry)
    }

    /// Bind and serve until [`PresenceServer::shutdown`] is called.
    pub async fn run(&self) -> PresenceResult<()> {
        let listener = TcpListener::bind(&self.config.bind_addr)
            .await
            .map_err(|e| PresenceError::ConfigError(format!("Failed to bind: {}", e)))?;

        tracing::info!(addr = %self.config.bind_addr, "Presence server listening");

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            let registry = Arc::clone(&self.registry);
                            let shutdown_rx = self.shutdown_tx.subscribe();

                            tokio::spawn(async move {
                                match accept_async(stream).await {
                                    Ok(ws) => {
                                        handle_connection(ws, peer_addr, registry, shutdown_rx).await;
                                    }
                                    Err(e) => {
                                        tracing::warn!(peer = %peer_addr, error = %e, "WebSocket handshake failed");
                                    }
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Accept failed");
                        }
                    }
                }

                _ = shutdown_rx.recv() => {
                    tracing::info!("Presence server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Stop the accept loop and disconnect all sessions.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Drive one connection: requests in, session events out, until the
/// transport closes, errors, or the server shuts down. Teardown runs
/// exactly once on every exit path.
async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    peer_addr: SocketAddr,
    registry: Arc<ClientRegistry>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (mut ws_sender, mut ws_receiver) = ws.split();
    let mut session: Option<SubscriptionSession> = None;

    tracing::info!(peer = %peer_addr, "New connection");

    loop {
        tokio::select! {
            // Requests from the client
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(request) => {
                                match process_client_message(request, &registry, &mut session) {
                                    Ok(reply) => reply,
                                    Err(e) => Some(ServerMessage::Error {
                                        message: e.to_string(),
                                        code: e.code().to_string(),
                                    }),
                                }
                            }
                            Err(e) => {
                                let err = PresenceError::InvalidMessage(e.to_string());
                                Some(ServerMessage::Error {
                                    message: err.to_string(),
                                    code: err.code().to_string(),
                                })
                            }
                        };

                        if let Some(reply) = reply {
                            if send_message(&mut ws_sender, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let err = PresenceError::InvalidMessage("Binary messages not supported".into());
                        let reply = ServerMessage::Error {
                            message: err.to_string(),
                            code: err.code().to_string(),
                        };
                        if send_message(&mut ws_sender, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if ws_sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(peer = %peer_addr, "Connection closed");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(peer = %peer_addr, error = %e, "WebSocket receive error");
                        break;
                    }
                    _ => {}
                }
            }

            // Session events to the client
            event = async {
                match session.as_mut() {
                    Some(s) => s.next_event().await,
                    None => std::future::pending().await,
                }
            } => {
                match event {
                    Some(event) => {
                        if send_message(&mut ws_sender, &ServerMessage::Event(event)).await.is_err() {
                            break;
                        }
                    }
                    // Event stream ended underneath the session
                    None => break,
                }
            }

            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    // Single teardown path: deregisters and broadcasts user_left to survivors.
    if let Some(mut session) = session.take() {
        session.close();
    }

    tracing::info!(peer = %peer_addr, "Connection cleaned up");
}

/// Handle one request. `Ok(None)` means no direct reply (the subscribe
/// stream speaks for itself, starting with `connected`).
fn process_client_message(
    message: ClientMessage,
    registry: &Arc<ClientRegistry>,
    session: &mut Option<SubscriptionSession>,
) -> PresenceResult<Option<ServerMessage>> {
    match message {
        ClientMessage::Subscribe => {
            if session.is_some() {
                return Err(PresenceError::AlreadySubscribed);
            }
            *session = Some(SubscriptionSession::open(Arc::clone(registry))?);
            Ok(None)
        }

        ClientMessage::SetStatus { client_id, status } => {
            let status: ClientStatus = status.parse()?;
            registry.set_status(&ClientId::from(client_id), status);
            // Unknown ids are indistinguishable from success: the endpoint
            // is idempotent and leaks nothing about registry membership.
            Ok(Some(ServerMessage::SetStatusResult { success: true }))
        }

        ClientMessage::GetPresence => Ok(Some(ServerMessage::Presence {
            clients: registry.clients(),
        })),
    }
}

/// Send a ServerMessage as a JSON text frame.
async fn send_message(sink: &mut WsSink, message: &ServerMessage) -> Result<(), WsError> {
    match serde_json::to_string(message) {
        Ok(json) => sink.send(Message::Text(json)).await,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            Ok(())
        }
    }
}
