//! Error types for the transport layer.

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listening socket failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Connecting to the remote endpoint failed.
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// Accepting an incoming connection (TCP accept or WebSocket
    /// handshake) failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// Receiving data on an established session failed.
    #[error("receive failed: {0}")]
    Receive(#[source] std::io::Error),
}
