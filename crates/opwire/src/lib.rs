//! # Opwire
//!
//! Bidirectional, opcode-multiplexed binary RPC runtime over WebSocket.
//!
//! Two endpoints exchange `[opcode][payload]` frames over a single
//! connection. Generated proxy code encodes typed outbound messages,
//! generated stub code routes typed inbound messages, and this workspace is
//! the hand-written core between them: frame codec, transport session
//! tracking, and the dispatch/error-isolation discipline.
//!
//! This crate provides the orchestrators that tie the layers together:
//!
//! - [`ProtocolServer`] — drains a server transport's event stream and runs
//!   the inbound pipeline for every connected session.
//! - [`ProtocolClient`] — the client-side counterpart, with an explicit
//!   [`poll`](ProtocolClient::poll) drain for hosts that own their own tick
//!   loop.
//!
//! Both share one pipeline contract: a malformed frame, an unknown opcode,
//! a decode failure, or a failing handler is logged and contained — it
//! never closes the connection and never propagates to the transport.
//!
//! ```rust,no_run
//! use opwire::prelude::*;
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Serialize, Deserialize)]
//! # struct Ping { nonce: u32 }
//!
//! # async fn demo() -> Result<(), OpwireError> {
//! let mut runtime = ProtocolRuntime::new(JsonCodec);
//! runtime.on_inbound::<Ping, _, _>(10, "Ping", |session, ping| async move {
//!     tracing::info!(%session, nonce = ping.nonce, "ping");
//!     Ok(())
//! });
//!
//! let server = ServerBuilder::new()
//!     .bind("127.0.0.1:4000")
//!     .build(runtime)
//!     .await?;
//! server.run().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod hooks;
mod pipeline;
mod server;

pub use client::{ClientOptions, ProtocolClient};
pub use error::OpwireError;
pub use hooks::EndpointHooks;
pub use server::{ProtocolServer, ServerBuilder};

pub mod prelude {
    //! Common imports for building an Opwire endpoint.

    pub use crate::{
        ClientOptions, EndpointHooks, OpwireError, ProtocolClient,
        ProtocolServer, ServerBuilder,
    };
    pub use opwire_protocol::{Codec, SessionId};
    #[cfg(feature = "json")]
    pub use opwire_protocol::JsonCodec;
    pub use opwire_runtime::{
        HandlerResult, OutboundProxy, ProtocolRuntime, UnknownOpcode,
    };
    pub use opwire_transport::{Transport, TransportEvent};
}

/// Default codec feature passthrough.
#[cfg(feature = "json")]
pub use opwire_protocol::JsonCodec;
