//! Client-side WebSocket transport using `tokio-tungstenite`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::StreamExt;
use opwire_protocol::SessionId;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::server::{close_message, read_loop, write_loop};
use crate::{Transport, TransportError, TransportEvent, SHUTDOWN_CLOSE_CODE};

/// Configuration for a client transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Local id for the single session this transport represents.
    ///
    /// The id never travels on the wire; it only keys events and sends so
    /// client and server code can share the same dispatch plumbing.
    pub session_id: SessionId,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session_id: SessionId::new(0),
        }
    }
}

struct ClientShared {
    session: SessionId,
    /// `None` once a close was requested; subsequent sends are dropped.
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    stopped: AtomicBool,
}

/// A single outbound WebSocket connection with a fixed session id.
///
/// Exposes the same [`Transport`] surface as the server transport so the
/// orchestration layer above does not care which side of the connection it
/// is on.
pub struct WsClientTransport {
    shared: Arc<ClientShared>,
}

impl WsClientTransport {
    /// Connects to `url` (e.g. `ws://127.0.0.1:4000`).
    ///
    /// Returns the transport handle and the event stream; a
    /// [`TransportEvent::Connected`] for the configured session id is the
    /// first event delivered.
    ///
    /// # Errors
    /// Returns [`TransportError::Connect`] if the connection or WebSocket
    /// handshake fails.
    pub async fn connect(
        url: &str,
        config: ClientConfig,
    ) -> Result<
        (Self, mpsc::UnboundedReceiver<TransportEvent>),
        TransportError,
    > {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| {
                TransportError::Connect(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let session = config.session_id;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(ClientShared {
            session,
            outbound: Mutex::new(Some(outbound_tx)),
            stopped: AtomicBool::new(false),
        });

        tracing::debug!(%session, url, "WebSocket client connected");
        let _ = events_tx.send(TransportEvent::Connected(session));

        let (write, read) = ws.split();
        tokio::spawn(write_loop(write, outbound_rx));

        let reader_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            read_loop(session, read, &events_tx).await;
            // Connection is gone; drop the sender so queued writes drain
            // and later sends become no-ops.
            reader_shared
                .outbound
                .lock()
                .expect("outbound sender poisoned")
                .take();
            tracing::debug!(%session, "session disconnected");
            let _ = events_tx.send(TransportEvent::Disconnected(session));
        });

        Ok((Self { shared }, events_rx))
    }

    /// The fixed id of this transport's single session.
    pub fn session_id(&self) -> SessionId {
        self.shared.session
    }

    fn request_close(&self, code: u16, reason: &str) {
        let mut outbound = self
            .shared
            .outbound
            .lock()
            .expect("outbound sender poisoned");
        if let Some(sender) = outbound.take() {
            let _ = sender.send(close_message(code, reason));
        }
    }
}

impl Transport for WsClientTransport {
    fn send(&self, session: SessionId, data: Bytes) {
        if session != self.shared.session {
            return;
        }
        let outbound = self
            .shared
            .outbound
            .lock()
            .expect("outbound sender poisoned");
        if let Some(sender) = outbound.as_ref() {
            let _ = sender.send(Message::Binary(data));
        }
    }

    fn close_session(&self, session: SessionId, code: u16, reason: &str) {
        if session != self.shared.session {
            return;
        }
        self.request_close(code, reason);
    }

    fn session_ids(&self) -> Vec<SessionId> {
        let outbound = self
            .shared
            .outbound
            .lock()
            .expect("outbound sender poisoned");
        if outbound.is_some() {
            vec![self.shared.session]
        } else {
            Vec::new()
        }
    }

    async fn stop(&self) {
        if self.shared.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.request_close(SHUTDOWN_CLOSE_CODE, "transport shutting down");
    }
}
