//! Websocket session: one connection, its outbound sends and inbound events.
//!
//! DESIGN
//! ======
//! [`Session::connect`] splits the socket into a writer task fed by an
//! unbounded channel and a reader task that decodes server frames into a
//! bounded event channel. The returned [`Session`] is a cheap clonable
//! handle; it is constructed once per connection and handed to whatever
//! needs to send, never reached through a global.
//!
//! Sends are fire-and-forget. Once the connection is gone they are dropped
//! and report `false`; nothing is queued for replay.

use frames::{ClientEvent, Position, ServerEvent};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ClientError;

const INBOUND_CAPACITY: usize = 256;

/// Sending half of a realtime connection.
#[derive(Clone, Debug)]
pub struct Session {
    outbound: mpsc::UnboundedSender<ClientEvent>,
}

impl Session {
    /// Open the websocket and start the reader and writer tasks.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connection`] if the base URL is unusable or the
    /// handshake fails, including when the server rejects the token.
    pub async fn connect(config: &ClientConfig) -> Result<(Self, mpsc::Receiver<ServerEvent>), ClientError> {
        let (socket, _) = tokio_tungstenite::connect_async(config.ws_url()?)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        let (mut sink, mut stream) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (in_tx, in_rx) = mpsc::channel::<ServerEvent>(INBOUND_CAPACITY);

        tokio::spawn(async move {
            while let Some(event) = out_rx.recv().await {
                let text = match frames::encode_event(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, event = event.name(), "session: failed to encode event");
                        continue;
                    }
                };
                if sink.send(WsMessage::Text(text.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => match frames::decode_server_event(text.as_str()) {
                        Ok(event) => {
                            if in_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "session: dropped undecodable server frame"),
                    },
                    Ok(WsMessage::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            debug!("session: reader finished");
        });

        Ok((Self { outbound: out_tx }, in_rx))
    }

    /// Session over an existing outbound channel, without a socket.
    #[must_use]
    pub fn from_channel(outbound: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self { outbound }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    fn emit(&self, event: ClientEvent) -> bool {
        self.outbound.send(event).is_ok()
    }

    pub fn join(&self, room_id: Uuid) -> bool {
        self.emit(ClientEvent::JoinProject { room_id })
    }

    pub fn leave(&self, room_id: Uuid) -> bool {
        self.emit(ClientEvent::LeaveProject { room_id })
    }

    pub fn send_cursor(&self, room_id: Uuid, position: Position, element_id: Option<String>) -> bool {
        self.emit(ClientEvent::CursorMove { room_id, position, element_id })
    }

    pub fn send_message(&self, room_id: Uuid, text: &str, sender_id: Uuid, client_ref: Option<String>) -> bool {
        self.emit(ClientEvent::SendMessage { room_id, text: text.to_owned(), sender_id: Some(sender_id), client_ref })
    }
}
