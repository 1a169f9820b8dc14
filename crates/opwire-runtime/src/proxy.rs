//! Outbound proxy support: typed message → codec → frame → send function.

use std::sync::Arc;

use opwire_protocol::{frame, Codec, SessionId};
use serde::Serialize;

use crate::RuntimeError;

/// The send function an outbound proxy delivers framed bytes to.
///
/// Supplied once at proxy construction; typically closes over the
/// transport's best-effort `send`.
pub type SendFn = Arc<dyn Fn(SessionId, Vec<u8>) + Send + Sync>;

/// Encodes and frames outbound messages.
///
/// Generated proxy types wrap this with one typed method per outbound
/// message, each pinning its message's fixed opcode. The proxy itself is
/// stateless with respect to sessions — the session id is an argument on
/// every send.
pub struct OutboundProxy<C: Codec> {
    codec: Arc<C>,
    send_fn: SendFn,
}

impl<C: Codec> OutboundProxy<C> {
    pub(crate) fn new(codec: Arc<C>, send_fn: SendFn) -> Self {
        Self { codec, send_fn }
    }

    /// Encodes `message`, frames it under `opcode`, and invokes the send
    /// function.
    ///
    /// Delivery is best-effort: the send function itself never reports
    /// failure (a dead session is a silent no-op at the transport).
    ///
    /// # Errors
    /// Returns [`RuntimeError::Encode`] if the codec rejects the message.
    pub fn send<T: Serialize>(
        &self,
        session: SessionId,
        opcode: i32,
        message: &T,
    ) -> Result<(), RuntimeError> {
        let payload = self
            .codec
            .encode(message)
            .map_err(|source| RuntimeError::Encode { opcode, source })?;
        (self.send_fn)(session, frame::build(opcode, &payload));
        Ok(())
    }
}

impl<C: Codec> Clone for OutboundProxy<C> {
    fn clone(&self) -> Self {
        Self {
            codec: Arc::clone(&self.codec),
            send_fn: Arc::clone(&self.send_fn),
        }
    }
}
