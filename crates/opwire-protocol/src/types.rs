//! Shared identity types.

use std::fmt;

/// Opaque identifier for one logical connection.
///
/// Assigned by the transport that owns the connection: server transports
/// use a monotonically increasing counter starting at 1 that is never
/// reused, client transports use a fixed caller-supplied id (default 0).
/// The id never travels on the wire — it is purely a local handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Creates a new `SessionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}
