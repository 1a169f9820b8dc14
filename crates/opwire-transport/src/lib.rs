//! Transport layer for Opwire.
//!
//! A transport owns physical connections and moves raw byte messages; it
//! knows nothing about opcodes or typed messages. Sessions are identified
//! by [`SessionId`] integers assigned here and looked up here at send time —
//! nothing above this layer ever holds a socket.
//!
//! Connection lifecycle and inbound bytes are delivered as a stream of
//! [`TransportEvent`]s over an unbounded channel handed out at
//! construction. Only binary WebSocket messages are forwarded;
//! text/ping/pong/control frames are consumed silently.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transports via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod client;
#[cfg(feature = "websocket")]
mod server;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use client::{ClientConfig, WsClientTransport};
#[cfg(feature = "websocket")]
pub use server::WsServerTransport;

use bytes::Bytes;
use opwire_protocol::SessionId;

/// WebSocket close code sent to every open session when a transport stops.
pub const SHUTDOWN_CLOSE_CODE: u16 = 1001;

/// Notifications emitted by a transport, in per-session arrival order.
///
/// Delivery is fire-and-forget from the transport's perspective: a slow or
/// absent consumer never blocks the socket tasks.
#[derive(Debug)]
pub enum TransportEvent {
    /// A session connected and was added to the session map.
    Connected(SessionId),
    /// A session disconnected and was removed from the session map.
    Disconnected(SessionId),
    /// One binary message arrived, normalized to a single owned buffer.
    Binary(SessionId, Bytes),
    /// A socket-level failure on one session. Fatal at most to that
    /// session, never to the transport.
    Error(SessionId, TransportError),
}

/// Connection ownership and best-effort byte delivery.
pub trait Transport: Send + Sync + 'static {
    /// Sends one binary message to a session.
    ///
    /// Best-effort: if the session is unknown, closing, or already gone,
    /// this is a silent no-op — whether that matters is the caller's call.
    fn send(&self, session: SessionId, data: Bytes);

    /// Requests a graceful close of a single session.
    ///
    /// No-op if the session does not exist. Queued outbound messages are
    /// flushed before the close frame; sends after this call are dropped.
    fn close_session(&self, session: SessionId, code: u16, reason: &str);

    /// Snapshot of currently connected session ids, for broadcast-style
    /// sends.
    fn session_ids(&self) -> Vec<SessionId>;

    /// Closes all open sessions and releases the listening/connecting
    /// resource. Idempotent: stopping an already-stopped transport is a
    /// no-op.
    async fn stop(&self);
}
