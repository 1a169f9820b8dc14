//! Caller-supplied hooks for endpoint events and contained errors.

use opwire_protocol::SessionId;
use opwire_runtime::{RuntimeError, UnknownOpcode};
use opwire_transport::TransportError;

/// Optional callbacks an endpoint invokes from its event loop.
///
/// All hooks are synchronous closures fixed at construction; each is a
/// notification, never a veto — returning from a hook cannot close a
/// session or fail a message. Missing hooks fall back to `tracing` logs
/// where a default behavior exists.
#[derive(Default)]
pub struct EndpointHooks {
    /// A session connected.
    pub on_connect: Option<Box<dyn Fn(SessionId) + Send + Sync>>,

    /// A session disconnected.
    pub on_disconnect: Option<Box<dyn Fn(SessionId) + Send + Sync>>,

    /// An inbound frame carried an opcode with no runtime entry.
    ///
    /// Priority 1 of the unknown-opcode chain: if set, neither the
    /// runtime-level hook nor the default warning runs.
    pub on_unknown_inbound_opcode:
        Option<Box<dyn Fn(&UnknownOpcode) + Send + Sync>>,

    /// An inbound message was too short to be a frame. Receives the raw
    /// bytes as delivered by the transport.
    pub on_invalid_frame: Option<Box<dyn Fn(SessionId, &[u8]) + Send + Sync>>,

    /// A decode failure or handler error was contained during dispatch.
    pub on_error: Option<Box<dyn Fn(SessionId, &RuntimeError) + Send + Sync>>,

    /// The transport reported a socket-level failure for one session.
    pub on_transport_error:
        Option<Box<dyn Fn(SessionId, &TransportError) + Send + Sync>>,
}

impl std::fmt::Debug for EndpointHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointHooks")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field(
                "on_unknown_inbound_opcode",
                &self.on_unknown_inbound_opcode.is_some(),
            )
            .field("on_invalid_frame", &self.on_invalid_frame.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_transport_error", &self.on_transport_error.is_some())
            .finish()
    }
}
