//! Wire protocol for Opwire.
//!
//! This crate defines everything both endpoints must agree on before any
//! typed message exists:
//!
//! - **Frame codec** ([`frame`]) — the `[opcode][payload]` byte layout of
//!   one logical message.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how typed messages are
//!   converted to/from payload bytes.
//! - **Session identity** ([`SessionId`]) — the integer handle a transport
//!   assigns to one logical connection.
//! - **Errors** ([`ProtocolError`]) — what can go wrong at this layer.
//!
//! # Architecture
//!
//! The protocol layer sits below transport and runtime. It holds no state
//! and knows nothing about connections or handlers — it only defines byte
//! layouts and conversion contracts.
//!
//! ```text
//! bytes → frame::parse → (opcode, payload) → Codec::decode → typed message
//! ```

mod codec;
mod error;
mod types;

pub mod frame;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use frame::Frame;
pub use types::SessionId;
