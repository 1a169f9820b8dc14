//! The shared inbound pipeline and its error-isolation boundary.
//!
//! Client and server run the exact same discipline for every transport
//! event. Processing one inbound message never returns an error and never
//! panics outward: the containment is a single wrapping combinator at the
//! message entry point, not scattered per call site.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use opwire_protocol::{frame, Codec, SessionId};
use opwire_runtime::{ProtocolRuntime, UnknownOpcode};
use opwire_transport::TransportEvent;
use tokio::sync::mpsc;

use crate::EndpointHooks;

/// Drains a transport event stream until it closes.
///
/// Each binary message is dispatched as its own task, so a handler that is
/// still pending for one session never delays messages from another.
/// Lifecycle and error events are handled inline; their hooks are sync and
/// cheap.
pub(crate) async fn drive<C: Codec>(
    pipeline: Arc<Pipeline<C>>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            event @ TransportEvent::Binary(..) => {
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    pipeline.handle_event(event).await;
                });
            }
            event => pipeline.handle_event(event).await,
        }
    }
}

pub(crate) struct Pipeline<C: Codec> {
    runtime: Arc<ProtocolRuntime<C>>,
    hooks: EndpointHooks,
    pub(crate) max_payload: Option<usize>,
}

impl<C: Codec> Pipeline<C> {
    pub(crate) fn new(
        runtime: Arc<ProtocolRuntime<C>>,
        hooks: EndpointHooks,
    ) -> Self {
        Self {
            runtime,
            hooks,
            max_payload: None,
        }
    }

    /// Processes one transport event. Infallible by contract.
    pub(crate) async fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected(session) => {
                tracing::debug!(%session, "session connected");
                if let Some(hook) = &self.hooks.on_connect {
                    hook(session);
                }
            }
            TransportEvent::Disconnected(session) => {
                tracing::debug!(%session, "session disconnected");
                if let Some(hook) = &self.hooks.on_disconnect {
                    hook(session);
                }
            }
            TransportEvent::Binary(session, data) => {
                self.handle_binary(session, data).await;
            }
            TransportEvent::Error(session, error) => {
                tracing::warn!(%session, %error, "transport error");
                if let Some(hook) = &self.hooks.on_transport_error {
                    hook(session, &error);
                }
            }
        }
    }

    /// Runs the inbound pipeline for one raw message.
    ///
    /// The whole pipeline — frame parse included — is wrapped in a single
    /// panic-absorbing boundary so the invariant "one bad message cannot
    /// take down the loop" holds structurally rather than by convention.
    async fn handle_binary(&self, session: SessionId, data: Bytes) {
        let result =
            AssertUnwindSafe(self.process(session, data)).catch_unwind().await;
        if let Err(panic) = result {
            tracing::error!(
                %session,
                panic = panic_message(&panic),
                "inbound message processing panicked"
            );
        }
    }

    async fn process(&self, session: SessionId, data: Bytes) {
        let Some(parsed) = frame::parse(&data) else {
            match &self.hooks.on_invalid_frame {
                Some(hook) => hook(session, &data),
                None => tracing::warn!(
                    %session,
                    len = data.len(),
                    "invalid frame dropped"
                ),
            }
            return;
        };

        let opcode = parsed.opcode;
        // Cheap subslice of the same buffer, not a copy.
        let payload = data.slice(frame::OPCODE_SIZE..);

        if let Some(limit) = self.max_payload {
            if payload.len() > limit {
                tracing::warn!(
                    %session,
                    opcode,
                    len = payload.len(),
                    limit,
                    "oversized payload dropped"
                );
                return;
            }
        }

        let Some(name) = self.runtime.inbound_opcode_name(opcode) else {
            self.handle_unknown(UnknownOpcode {
                session,
                opcode,
                payload,
            });
            return;
        };

        if let Err(error) = self
            .runtime
            .dispatch_inbound(session, opcode, &payload)
            .await
        {
            tracing::error!(
                %session,
                opcode,
                name,
                %error,
                "inbound dispatch failed"
            );
            if let Some(hook) = &self.hooks.on_error {
                hook(session, &error);
            }
        }
    }

    /// Unknown-opcode chain, strict priority, exactly one branch runs:
    /// endpoint hook, then runtime hook, then a warning log. Never closes
    /// the session.
    fn handle_unknown(&self, event: UnknownOpcode) {
        if let Some(hook) = &self.hooks.on_unknown_inbound_opcode {
            hook(&event);
        } else if let Some(hook) = self.runtime.unknown_inbound_hook() {
            hook(&event);
        } else {
            tracing::warn!(
                session = %event.session,
                opcode = event.opcode,
                len = event.payload.len(),
                "unknown inbound opcode dropped"
            );
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
