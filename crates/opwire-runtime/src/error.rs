//! Error types for the dispatch runtime.

use opwire_protocol::ProtocolError;

/// Error type application handlers may return.
///
/// Boxed so handlers can use `?` with any error type they like; the runtime
/// only logs and forwards it, never inspects it.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while dispatching or sending a typed message.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Dispatch was attempted for an opcode with no table entry.
    ///
    /// The orchestrator filters unknown opcodes through
    /// `inbound_opcode_name` before dispatching, so hitting this variant
    /// indicates a wiring bug, not a peer problem.
    #[error("no inbound entry for opcode {0}")]
    OpcodeNotFound(i32),

    /// Encoding an outbound message failed.
    #[error("encode failed for opcode {opcode}: {source}")]
    Encode {
        /// Opcode the message was being framed under.
        opcode: i32,
        #[source]
        source: ProtocolError,
    },

    /// The payload did not decode as the type registered for this opcode.
    #[error("decode failed for opcode {opcode} ({name}): {source}")]
    Decode {
        /// Opcode the payload arrived under.
        opcode: i32,
        /// Registered message-type name, for diagnostics.
        name: &'static str,
        #[source]
        source: ProtocolError,
    },

    /// A registered handler returned an error.
    #[error("handler failed for opcode {opcode} ({name}): {source}")]
    Handler {
        /// Opcode that was dispatched.
        opcode: i32,
        /// Registered message-type name.
        name: &'static str,
        #[source]
        source: HandlerError,
    },
}
