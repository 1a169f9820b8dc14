//! The opcode table and inbound dispatch path.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::{self, BoxFuture};
use opwire_protocol::{Codec, SessionId};
use serde::de::DeserializeOwned;

use crate::proxy::{OutboundProxy, SendFn};
use crate::RuntimeError;

/// Result type returned by registered handlers.
pub type HandlerResult = Result<(), crate::HandlerError>;

/// An inbound message that no table entry matched.
///
/// Ephemeral: passed by reference to the unknown-opcode hook chain and then
/// discarded, never stored.
#[derive(Debug, Clone)]
pub struct UnknownOpcode {
    /// Session the message arrived on.
    pub session: SessionId,
    /// The unmatched opcode.
    pub opcode: i32,
    /// Raw payload bytes (owned slice of the inbound frame).
    pub payload: Bytes,
}

/// Runtime-level fallback for unknown inbound opcodes.
///
/// Sits at priority 2 in the orchestrator's hook chain, between the
/// endpoint's own hook and the default warning log.
pub type UnknownOpcodeHook = Box<dyn Fn(&UnknownOpcode) + Send + Sync>;

/// Dispatch closure stored per opcode: decodes the payload and invokes the
/// registered handler. Decoding happens before the future is built so the
/// future owns the message and stays `'static`.
type DispatchFn = Box<
    dyn Fn(SessionId, &[u8]) -> BoxFuture<'static, Result<(), RuntimeError>>
        + Send
        + Sync,
>;

struct InboundEntry {
    name: &'static str,
    dispatch: DispatchFn,
}

/// Dispatch runtime for one protocol group.
///
/// Generated stub code populates the inbound table through
/// [`declare_inbound`](Self::declare_inbound) and
/// [`on_inbound`](Self::on_inbound); the generated proxy factory declares
/// outbound names and wraps [`outbound_proxy`](Self::outbound_proxy).
/// Registration requires `&mut self`, so once the runtime is shared the
/// tables are effectively frozen.
///
/// Opcode uniqueness is a generation-time contract: registering an opcode
/// twice replaces the previous entry (that is also how
/// `declare_inbound` followed by `on_inbound` upgrades a decode-only entry
/// to a handled one).
pub struct ProtocolRuntime<C: Codec> {
    codec: Arc<C>,
    inbound: HashMap<i32, InboundEntry>,
    outbound_names: HashMap<i32, &'static str>,
    unknown_hook: Option<UnknownOpcodeHook>,
}

impl<C: Codec> ProtocolRuntime<C> {
    /// Creates an empty runtime around the given codec.
    pub fn new(codec: C) -> Self {
        Self {
            codec: Arc::new(codec),
            inbound: HashMap::new(),
            outbound_names: HashMap::new(),
            unknown_hook: None,
        }
    }

    /// Declares a known inbound message type without attaching a handler.
    ///
    /// Messages for a declared-but-unhandled opcode are decoded and then
    /// dropped silently — a deliberate no-op, not an error. This lets a
    /// stub register handlers for a subset of its protocol group while the
    /// runtime still recognizes (and names) every inbound opcode.
    pub fn declare_inbound<T>(&mut self, opcode: i32, name: &'static str)
    where
        T: DeserializeOwned + Send + 'static,
    {
        let codec = Arc::clone(&self.codec);
        let dispatch: DispatchFn = Box::new(move |session, payload| {
            let decoded = codec.decode::<T>(payload);
            match decoded {
                Ok(_) => {
                    tracing::trace!(
                        %session,
                        opcode,
                        name,
                        "no handler registered; message dropped"
                    );
                    Box::pin(future::ready(Ok(())))
                }
                Err(source) => Box::pin(future::ready(Err(
                    RuntimeError::Decode {
                        opcode,
                        name,
                        source,
                    },
                ))),
            }
        });
        self.inbound.insert(opcode, InboundEntry { name, dispatch });
    }

    /// Registers a handler for an inbound message type.
    ///
    /// The handler runs with the decoded message; its error (if any) is
    /// surfaced as [`RuntimeError::Handler`] and contained at the
    /// orchestrator boundary.
    pub fn on_inbound<T, F, Fut>(
        &mut self,
        opcode: i32,
        name: &'static str,
        handler: F,
    ) where
        T: DeserializeOwned + Send + 'static,
        F: Fn(SessionId, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let codec = Arc::clone(&self.codec);
        let dispatch: DispatchFn = Box::new(move |session, payload| {
            match codec.decode::<T>(payload) {
                Ok(message) => {
                    let fut = handler(session, message);
                    Box::pin(async move {
                        fut.await.map_err(|source| RuntimeError::Handler {
                            opcode,
                            name,
                            source,
                        })
                    })
                }
                Err(source) => Box::pin(future::ready(Err(
                    RuntimeError::Decode {
                        opcode,
                        name,
                        source,
                    },
                ))),
            }
        });
        self.inbound.insert(opcode, InboundEntry { name, dispatch });
    }

    /// Declares an outbound message type name for diagnostics.
    pub fn declare_outbound(&mut self, opcode: i32, name: &'static str) {
        self.outbound_names.insert(opcode, name);
    }

    /// Returns the registered name for an inbound opcode, if any.
    ///
    /// O(1) and side-effect-free; the orchestrator calls this before
    /// committing to a decode attempt, and again when logging.
    pub fn inbound_opcode_name(&self, opcode: i32) -> Option<&'static str> {
        self.inbound.get(&opcode).map(|entry| entry.name)
    }

    /// Returns the declared name for an outbound opcode, if any.
    pub fn outbound_opcode_name(&self, opcode: i32) -> Option<&'static str> {
        self.outbound_names.get(&opcode).copied()
    }

    /// Decodes the payload and invokes the handler registered for `opcode`.
    ///
    /// # Errors
    /// - [`RuntimeError::OpcodeNotFound`] if no entry exists — callers are
    ///   expected to have filtered via
    ///   [`inbound_opcode_name`](Self::inbound_opcode_name) first.
    /// - [`RuntimeError::Decode`] / [`RuntimeError::Handler`] from the
    ///   entry's dispatch closure.
    pub async fn dispatch_inbound(
        &self,
        session: SessionId,
        opcode: i32,
        payload: &[u8],
    ) -> Result<(), RuntimeError> {
        let entry = self
            .inbound
            .get(&opcode)
            .ok_or(RuntimeError::OpcodeNotFound(opcode))?;
        (entry.dispatch)(session, payload).await
    }

    /// Installs the runtime-level fallback for unknown inbound opcodes.
    pub fn set_unknown_inbound_hook(&mut self, hook: UnknownOpcodeHook) {
        self.unknown_hook = Some(hook);
    }

    /// Returns the runtime-level unknown-opcode hook, if installed.
    pub fn unknown_inbound_hook(&self) -> Option<&UnknownOpcodeHook> {
        self.unknown_hook.as_ref()
    }

    /// Creates an outbound proxy that frames messages and passes them to
    /// `send_fn`.
    ///
    /// The proxy shares this runtime's codec and holds no session state;
    /// `send_fn` is supplied once and typically closes over the transport.
    pub fn outbound_proxy(&self, send_fn: SendFn) -> OutboundProxy<C> {
        OutboundProxy::new(Arc::clone(&self.codec), send_fn)
    }
}
