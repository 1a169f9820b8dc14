//! Server endpoint: transport event loop + inbound pipeline.

use std::sync::Arc;

use bytes::Bytes;
use opwire_protocol::Codec;
use opwire_runtime::{OutboundProxy, ProtocolRuntime};
use opwire_transport::{Transport, TransportEvent, WsServerTransport};
use tokio::sync::mpsc;

use crate::pipeline::{self, Pipeline};
use crate::{EndpointHooks, OpwireError};

/// Builder for configuring and binding a [`ProtocolServer`] on the default
/// WebSocket transport.
///
/// # Example
///
/// ```rust,ignore
/// let server = ServerBuilder::new()
///     .bind("0.0.0.0:4000")
///     .hooks(hooks)
///     .build(runtime)
///     .await?;
/// server.run().await;
/// ```
pub struct ServerBuilder {
    bind_addr: String,
    hooks: EndpointHooks,
    max_payload: Option<usize>,
}

impl ServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".to_string(),
            hooks: EndpointHooks::default(),
            max_payload: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Installs endpoint hooks.
    pub fn hooks(mut self, hooks: EndpointHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Caps inbound payload size; oversized messages are dropped with a
    /// warning. Default: no limit.
    pub fn max_payload(mut self, limit: usize) -> Self {
        self.max_payload = Some(limit);
        self
    }

    /// Binds a WebSocket transport and assembles the server endpoint.
    ///
    /// # Errors
    /// Returns the bind failure from the transport; this is the one error
    /// category that propagates to callers.
    pub async fn build<C: Codec>(
        self,
        runtime: ProtocolRuntime<C>,
    ) -> Result<ProtocolServer<WsServerTransport, C>, OpwireError> {
        let (transport, events) =
            WsServerTransport::bind(&self.bind_addr).await?;
        let mut server =
            ProtocolServer::new(transport, events, runtime, self.hooks);
        server.pipeline.max_payload = self.max_payload;
        Ok(server)
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A server endpoint: one transport, one protocol-group runtime, one event
/// loop.
///
/// The endpoint itself is stateless per message; the only persistent state
/// is the transport ↔ runtime association fixed at construction. Clone the
/// [`proxy`](Self::proxy) and [`transport`](Self::transport) handles you
/// need before calling [`run`](Self::run), which consumes the endpoint.
pub struct ProtocolServer<T: Transport, C: Codec> {
    transport: Arc<T>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    pub(crate) pipeline: Pipeline<C>,
    proxy: OutboundProxy<C>,
}

impl<T: Transport, C: Codec> ProtocolServer<T, C> {
    /// Assembles an endpoint from an already-started transport and its
    /// event stream.
    pub fn new(
        transport: T,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        runtime: ProtocolRuntime<C>,
        hooks: EndpointHooks,
    ) -> Self {
        let transport = Arc::new(transport);
        let runtime = Arc::new(runtime);

        // The proxy's send function closes over the transport once; the
        // proxy never sees sockets or session state.
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
        }
    }

    /// The outbound proxy for this endpoint. Cheap to clone.
    pub fn proxy(&self) -> OutboundProxy<C> {
        self.proxy.clone()
    }

    /// The transport handle, for broadcast-style sends and shutdown.
    pub fn transport(&self) -> Arc<T> {
        Arc::clone(&self.transport)
    }

    /// Runs the event loop until the transport stops and its event stream
    /// drains.
    ///
    /// Every inbound message is processed inside the pipeline's isolation
    /// boundary, each as an independent task: a slow or parked handler on
    /// one session never delays dispatch for another. This loop cannot be
    /// broken by peer input.
    pub async fn run(self) {
        tracing::info!("server endpoint running");
        let Self {
            transport: _transport,
            events,
            pipeline,
            proxy: _proxy,
        } = self;
        pipeline::drive(Arc::new(pipeline), events).await;
        tracing::info!("transport event stream ended; server endpoint done");
    }
}
