//! The "Chat" protocol group, written the way generated Proxy/Stub code
//! comes out of a schema compiler: fixed opcodes, one typed registration
//! method per inbound message, one typed send method per outbound message.

use std::future::Future;

use opwire_protocol::{Codec, SessionId};
use opwire_runtime::{
    HandlerResult, OutboundProxy, ProtocolRuntime, RuntimeError,
};
use serde::{Deserialize, Serialize};

/// Client → server: one chat line.
pub const OP_CHAT_SEND: i32 = 101;
/// Server → client: a chat line fanned out to everyone.
pub const OP_CHAT_BROADCAST: i32 = 201;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSend {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBroadcast {
    pub from: u64,
    pub text: String,
}

/// Server-side stub: declares every inbound opcode of the group and offers
/// typed handler registration.
pub struct ChatServerStub;

impl ChatServerStub {
    /// Declares all of the group's opcodes so the runtime can name them
    /// even before (or without) handlers.
    pub fn register<C: Codec>(runtime: &mut ProtocolRuntime<C>) {
        runtime.declare_inbound::<ChatSend>(OP_CHAT_SEND, "ChatSend");
        runtime.declare_outbound(OP_CHAT_BROADCAST, "ChatBroadcast");
    }

    pub fn on_chat_send<C, F, Fut>(runtime: &mut ProtocolRuntime<C>, handler: F)
    where
        C: Codec,
        F: Fn(SessionId, ChatSend) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        runtime.on_inbound::<ChatSend, _, _>(
            OP_CHAT_SEND,
            "ChatSend",
            handler,
        );
    }
}

/// Server-side proxy: typed senders for the group's outbound messages.
pub struct ChatServerProxy<C: Codec> {
    inner: OutboundProxy<C>,
}

impl<C: Codec> ChatServerProxy<C> {
    pub fn new(inner: OutboundProxy<C>) -> Self {
        Self { inner }
    }

    pub fn send_chat_broadcast(
        &self,
        session: SessionId,
        message: &ChatBroadcast,
    ) -> Result<(), RuntimeError> {
        self.inner.send(session, OP_CHAT_BROADCAST, message)
    }
}

/// Client-side stub: the mirror image of the server stub.
pub struct ChatClientStub;

impl ChatClientStub {
    pub fn register<C: Codec>(runtime: &mut ProtocolRuntime<C>) {
        runtime
            .declare_inbound::<ChatBroadcast>(OP_CHAT_BROADCAST, "ChatBroadcast");
        runtime.declare_outbound(OP_CHAT_SEND, "ChatSend");
    }

    pub fn on_chat_broadcast<C, F, Fut>(
        runtime: &mut ProtocolRuntime<C>,
        handler: F,
    ) where
        C: Codec,
        F: Fn(SessionId, ChatBroadcast) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        runtime.on_inbound::<ChatBroadcast, _, _>(
            OP_CHAT_BROADCAST,
            "ChatBroadcast",
            handler,
        );
    }
}

/// Client-side proxy.
pub struct ChatClientProxy<C: Codec> {
    inner: OutboundProxy<C>,
}

impl<C: Codec> ChatClientProxy<C> {
    pub fn new(inner: OutboundProxy<C>) -> Self {
        Self { inner }
    }

    pub fn send_chat_send(
        &self,
        session: SessionId,
        message: &ChatSend,
    ) -> Result<(), RuntimeError> {
        self.inner.send(session, OP_CHAT_SEND, message)
    }
}
