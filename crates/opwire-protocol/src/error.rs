//! Error types for the protocol layer.

/// Errors that can occur at the frame/codec layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a typed message into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a typed message).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A caller-supplied destination buffer was too small for the frame.
    #[error("destination buffer too small: required {required}, available {available}")]
    BufferTooSmall {
        /// Bytes needed to hold the whole frame.
        required: usize,
        /// Bytes actually available in the destination.
        available: usize,
    },
}
