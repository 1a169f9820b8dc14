//! Client endpoint: same pipeline as the server, plus an explicit drain
//! entry point for hosts that own their own consumer loop.
//!
//! The transport's socket tasks enqueue events on one channel per
//! connection; [`ProtocolClient::poll`] dequeues and dispatches in strict
//! FIFO order, once per consumer cycle. Hosts without a tick loop can use
//! [`ProtocolClient::run`] instead and drain continuously.

use std::sync::Arc;

use bytes::Bytes;
use opwire_protocol::{Codec, SessionId};
use opwire_runtime::{OutboundProxy, ProtocolRuntime};
use opwire_transport::{
    ClientConfig, Transport, TransportEvent, WsClientTransport,
};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::pipeline::{self, Pipeline};
use crate::{EndpointHooks, OpwireError};

/// Configuration for a client endpoint.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Local session id (never on the wire). Default 0.
    pub session_id: SessionId,
    /// Maximum events processed per [`poll`](ProtocolClient::poll) call.
    /// Default: drain the whole queue each cycle.
    pub max_per_poll: Option<usize>,
    /// Inbound payload size cap; oversized messages are dropped with a
    /// warning. Default: no limit.
    pub max_payload: Option<usize>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            session_id: SessionId::new(0),
            max_per_poll: None,
            max_payload: None,
        }
    }
}

/// A client endpoint over a single connection.
pub struct ProtocolClient<T: Transport, C: Codec> {
    transport: Arc<T>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    pipeline: Pipeline<C>,
    proxy: OutboundProxy<C>,
    max_per_poll: Option<usize>,
}

impl<C: Codec> ProtocolClient<WsClientTransport, C> {
    /// Connects a WebSocket transport and assembles the client endpoint.
    ///
    /// # Errors
    /// Returns the connect failure from the transport.
    pub async fn connect(
        url: &str,
        runtime: ProtocolRuntime<C>,
        hooks: EndpointHooks,
        options: ClientOptions,
    ) -> Result<Self, OpwireError> {
        let (transport, events) = WsClientTransport::connect(
            url,
            ClientConfig {
                session_id: options.session_id,
            },
        )
        .await?;
        let mut client =
            ProtocolClient::new(transport, events, runtime, hooks);
        client.pipeline.max_payload = options.max_payload;
        client.max_per_poll = options.max_per_poll;
        Ok(client)
    }
}

impl<T: Transport, C: Codec> ProtocolClient<T, C> {
    /// Assembles a client endpoint from an already-connected transport and
    /// its event stream.
    pub fn new(
        transport: T,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        runtime: ProtocolRuntime<C>,
        hooks: EndpointHooks,
    ) -> Self {
        let transport = Arc::new(transport);
        let runtime = Arc::new(runtime);

        let send_transport = Arc::clone(&transport);
        let proxy = runtime.outbound_proxy(Arc::new(
            move |session, frame: Vec<u8>| {
                send_transport.send(session, Bytes::from(frame));
            },
        ));

        Self {
            transport,
            events,
            pipeline: Pipeline::new(runtime, hooks),
            proxy,
            max_per_poll: None,
        }
    }

    /// The outbound proxy for this endpoint. Cheap to clone.
    pub fn proxy(&self) -> OutboundProxy<C> {
        self.proxy.clone()
    }

    /// The transport handle, for shutdown.
    pub fn transport(&self) -> Arc<T> {
        Arc::clone(&self.transport)
    }

    /// Drains queued events and dispatches them in FIFO order.
    ///
    /// Call once per consumer cycle (e.g. per frame of a render loop).
    /// Processes everything currently queued, or at most `max_per_poll`
    /// events if configured. Returns the number of events processed.
    /// Never fails: per-message errors are contained by the pipeline.
    pub async fn poll(&mut self) -> usize {
        let mut processed = 0;
        loop {
            if let Some(limit) = self.max_per_poll {
                if processed >= limit {
                    break;
                }
            }
            match self.events.try_recv() {
                Ok(event) => {
                    self.pipeline.handle_event(event).await;
                    processed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    break;
                }
            }
        }
        processed
    }

    /// Runs the event loop until the connection ends, for hosts without a
    /// tick loop of their own.
    ///
    /// Unlike [`poll`](Self::poll), which dispatches inline on the
    /// consumer's cycle, this loop spawns each binary message as its own
    /// task — a pending handler never delays later messages.
    pub async fn run(self) {
        tracing::info!("client endpoint running");
        let Self {
            transport: _transport,
            events,
            pipeline,
            proxy: _proxy,
            max_per_poll: _,
        } = self;
        pipeline::drive(Arc::new(pipeline), events).await;
        tracing::info!("transport event stream ended; client endpoint done");
    }
}
