//! Unified error type for the Opwire meta crate.

use opwire_protocol::ProtocolError;
use opwire_runtime::RuntimeError;
use opwire_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Only transport bootstrap failures (`bind`/`connect`) actually reach
/// callers through endpoint APIs — per-message errors are contained at the
/// pipeline boundary and surface as logs and hooks instead.
#[derive(Debug, thiserror::Error)]
pub enum OpwireError {
    /// A transport-level error (bind, connect, socket I/O).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame/codec-level error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A dispatch-level error (decode, handler, missing opcode).
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Bind(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "taken",
        ));
        let wrapped: OpwireError = err.into();
        assert!(matches!(wrapped, OpwireError::Transport(_)));
        assert!(wrapped.to_string().contains("bind failed"));
    }

    #[test]
    fn test_from_runtime_error() {
        let err = RuntimeError::OpcodeNotFound(42);
        let wrapped: OpwireError = err.into();
        assert!(matches!(wrapped, OpwireError::Runtime(_)));
        assert!(wrapped.to_string().contains("42"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::BufferTooSmall {
            required: 8,
            available: 4,
        };
        let wrapped: OpwireError = err.into();
        assert!(matches!(wrapped, OpwireError::Protocol(_)));
    }
}
