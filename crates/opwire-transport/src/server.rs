//! Server-side WebSocket transport using `tokio-tungstenite`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use opwire_protocol::SessionId;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::{Transport, TransportError, TransportEvent, SHUTDOWN_CLOSE_CODE};

/// One tracked connection. The socket itself lives in the session's
/// reader/writer tasks; the map only holds the outbound channel into the
/// writer, which is what makes `send` safe to call from handler code.
struct Session {
    outbound: mpsc::UnboundedSender<Message>,
    connected_at: Instant,
    closing: bool,
}

struct Shared {
    sessions: Mutex<HashMap<SessionId, Session>>,
    /// Monotonic id source. Starts at 1 and is never reused, so a late
    /// message for a stale id can never be attributed to a new connection.
    next_session_id: AtomicU64,
    stopped: AtomicBool,
}

/// A listening WebSocket transport.
///
/// Accepts connections in a background task, assigns each a fresh
/// [`SessionId`], and runs one reader and one writer task per session.
/// All session-map mutation happens on the transport's own connect and
/// disconnect paths.
pub struct WsServerTransport {
    local_addr: SocketAddr,
    shared: Arc<Shared>,
    accept_task: JoinHandle<()>,
}

impl WsServerTransport {
    /// Binds to `addr` and starts accepting connections.
    ///
    /// Returns the transport handle and the event stream. Use
    /// `"host:0"` to let the OS pick a port, then read it back via
    /// [`local_addr`](Self::local_addr).
    ///
    /// # Errors
    /// Returns [`TransportError::Bind`] if the listening socket cannot be
    /// bound.
    pub async fn bind(
        addr: &str,
    ) -> Result<
        (Self, mpsc::UnboundedReceiver<TransportEvent>),
        TransportError,
    > {
        let listener =
            TcpListener::bind(addr).await.map_err(TransportError::Bind)?;
        let local_addr =
            listener.local_addr().map_err(TransportError::Bind)?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            sessions: Mutex::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
            stopped: AtomicBool::new(false),
        });

        let accept_shared = Arc::clone(&shared);
        let accept_task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let shared = Arc::clone(&accept_shared);
                        let events = events_tx.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, peer, shared, events)
                                .await;
                        });
                    }
                    Err(e) => {
                        // Persistent failures (e.g. fd exhaustion) would
                        // otherwise hot-spin this loop.
                        tracing::error!(error = %e, "accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        });

        tracing::info!(%local_addr, "WebSocket transport listening");
        Ok((
            Self {
                local_addr,
                shared,
                accept_task,
            },
            events_rx,
        ))
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns when the given session connected, if it is still tracked.
    pub fn connected_at(&self, session: SessionId) -> Option<Instant> {
        self.shared
            .sessions
            .lock()
            .expect("session map poisoned")
            .get(&session)
            .map(|s| s.connected_at)
    }
}

impl Transport for WsServerTransport {
    fn send(&self, session: SessionId, data: Bytes) {
        let sessions =
            self.shared.sessions.lock().expect("session map poisoned");
        if let Some(entry) = sessions.get(&session) {
            if !entry.closing {
                let _ = entry.outbound.send(Message::Binary(data));
            }
        }
    }

    fn close_session(&self, session: SessionId, code: u16, reason: &str) {
        let mut sessions =
            self.shared.sessions.lock().expect("session map poisoned");
        if let Some(entry) = sessions.get_mut(&session) {
            if !entry.closing {
                entry.closing = true;
                let _ = entry.outbound.send(close_message(code, reason));
            }
        }
    }

    fn session_ids(&self) -> Vec<SessionId> {
        self.shared
            .sessions
            .lock()
            .expect("session map poisoned")
            .keys()
            .copied()
            .collect()
    }

    async fn stop(&self) {
        if self.shared.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        // Stop admitting connections, then ask every session to close.
        // Reader tasks observe the close and remove their map entries.
        self.accept_task.abort();
        let mut sessions =
            self.shared.sessions.lock().expect("session map poisoned");
        for entry in sessions.values_mut() {
            if !entry.closing {
                entry.closing = true;
                let _ = entry.outbound.send(close_message(
                    SHUTDOWN_CLOSE_CODE,
                    "transport shutting down",
                ));
            }
        }
        tracing::info!("WebSocket transport stopped");
    }
}

impl Drop for WsServerTransport {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

pub(crate) fn close_message(code: u16, reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::from(code),
        reason: reason.to_owned().into(),
    }))
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<Shared>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            let err = TransportError::Accept(std::io::Error::new(
                std::io::ErrorKind::ConnectionAborted,
                e,
            ));
            tracing::debug!(%peer, error = %err, "WebSocket handshake failed");
            return;
        }
    };
    let session = SessionId::new(
        shared.next_session_id.fetch_add(1, Ordering::Relaxed),
    );
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    {
        // `stop()` sets the flag before taking this lock, so a session
        // admitted here is always reached by the shutdown close sent under
        // the same lock; a session that loses the race is closed right
        // here instead of being tracked.
        let mut sessions =
            shared.sessions.lock().expect("session map poisoned");
        if shared.stopped.load(Ordering::SeqCst) {
            drop(sessions);
            let (write, _read) = ws.split();
            let _ = outbound_tx.send(close_message(
                SHUTDOWN_CLOSE_CODE,
                "transport shutting down",
            ));
            drop(outbound_tx);
            write_loop(write, outbound_rx).await;
            return;
        }
        sessions.insert(
            session,
            Session {
                outbound: outbound_tx,
                connected_at: Instant::now(),
                closing: false,
            },
        );
    }
    tracing::debug!(%session, %peer, "session connected");
    let _ = events.send(TransportEvent::Connected(session));

    let (write, read) = ws.split();
    tokio::spawn(write_loop(write, outbound_rx));
    read_loop(session, read, &events).await;

    // Removing the entry drops the outbound sender; the writer task drains
    // whatever is queued and closes the sink on its own.
    shared
        .sessions
        .lock()
        .expect("session map poisoned")
        .remove(&session);
    tracing::debug!(%session, "session disconnected");
    let _ = events.send(TransportEvent::Disconnected(session));
}

pub(crate) async fn write_loop<S>(
    mut write: SplitSink<tokio_tungstenite::WebSocketStream<S>, Message>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    while let Some(msg) = outbound.recv().await {
        let is_close = matches!(msg, Message::Close(_));
        if write.send(msg).await.is_err() {
            break;
        }
        if is_close {
            break;
        }
    }
    let _ = write.close().await;
}

pub(crate) async fn read_loop<S>(
    session: SessionId,
    mut read: SplitStream<tokio_tungstenite::WebSocketStream<S>>,
    events: &mpsc::UnboundedSender<TransportEvent>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    while let Some(msg) = read.next().await {
        match msg {
            // `Bytes` is already a single owned buffer; forward it as-is.
            Ok(Message::Binary(data)) => {
                let _ = events.send(TransportEvent::Binary(session, data));
            }
            Ok(Message::Close(_)) => break,
            // Text and ping/pong/raw frames are not part of the protocol.
            Ok(_) => {}
            Err(e) => {
                let err = TransportError::Receive(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    e,
                ));
                let _ = events.send(TransportEvent::Error(session, err));
                break;
            }
        }
    }
}
