//! Per-protocol-group dispatch runtime for Opwire.
//!
//! A protocol group is one set of opcodes with generated Proxy/Stub code on
//! either end. This crate is the hand-written contract those generated
//! pieces plug into:
//!
//! - [`ProtocolRuntime`] — holds the opcode → handler table (populated by
//!   stub registration) and the opcode → name tables used for diagnostics.
//! - [`OutboundProxy`] — encodes a typed message, frames it, and hands the
//!   bytes to a send function supplied once at construction.
//! - [`RuntimeError`] — what can go wrong between payload bytes and a
//!   handler return.
//!
//! The tables are built once during registration (`&mut self`) and are
//! read-only during dispatch (`&self`), which keeps the hot path free of
//! locks and allocation beyond the boxed handler future.

mod error;
mod proxy;
mod runtime;

pub use error::{HandlerError, RuntimeError};
pub use proxy::{OutboundProxy, SendFn};
pub use runtime::{
    HandlerResult, ProtocolRuntime, UnknownOpcode, UnknownOpcodeHook,
};
