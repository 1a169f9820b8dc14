//! Codec trait and the default JSON implementation.
//!
//! A codec converts typed messages to and from payload bytes. The core is
//! codec-agnostic: everything above this crate calls the [`Codec`] trait and
//! never interprets payload bytes itself, so JSON and Protobuf codecs are
//! interchangeable swap-ins with identical behavioral contracts.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Converts typed messages to and from payload bytes.
///
/// `Send + Sync + 'static` because a codec is shared by every dispatch
/// closure in a runtime and may be driven from any Tokio worker thread.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into payload bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes payload bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do not
    /// match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// Human-readable, handy during development; swap in a binary codec for
/// production traffic without touching anything above this layer.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Ping {
        nonce: u32,
    }

    #[test]
    fn test_json_round_trip() {
        let codec = JsonCodec;
        let bytes = codec.encode(&Ping { nonce: 7 }).unwrap();
        let decoded: Ping = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, Ping { nonce: 7 });
    }

    #[test]
    fn test_json_decode_failure() {
        let codec = JsonCodec;
        let result: Result<Ping, _> = codec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_decode_wrong_shape() {
        let codec = JsonCodec;
        let result: Result<Ping, _> = codec.decode(b"{\"other\":1}");
        assert!(result.is_err());
    }
}
