//! `MsgPack` envelope codec.

use remoting_core::{CodecError, EnvelopeCodec, RequestEnvelope, ResponseEnvelope};

/// Content type of [`MsgPackCodec`] payloads.
pub const MSGPACK_CONTENT_TYPE: &str = "application/x-msgpack";

/// Encodes envelopes as `MsgPack` maps via `rmp-serde`.
///
/// For hosting the gateway where no AMF codec is wired in, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl EnvelopeCodec for MsgPackCodec {
    fn decode(&self, bytes: &[u8]) -> Result<RequestEnvelope, CodecError> {
        rmp_serde::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn encode(&self, envelope: &ResponseEnvelope) -> Result<Vec<u8>, CodecError> {
        rmp_serde::to_vec_named(envelope).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn content_type(&self) -> &'static str {
        MSGPACK_CONTENT_TYPE
    }
}

#[cfg(test)]
mod tests {
    use remoting_core::{Message, Response, Value};

    use super::*;

    #[test]
    fn decodes_named_request() {
        let mut envelope = RequestEnvelope::new(3, 0);
        envelope.insert(
            "/1",
            Message::new("math.add", vec![Value::from(1), Value::from(2)])
                .with_credentials("alice", "pw"),
        );
        let bytes = rmp_serde::to_vec_named(&envelope).unwrap();

        let decoded = MsgPackCodec.decode(&bytes).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn rejects_garbage() {
        let err = MsgPackCodec.decode(b"\xc1not msgpack").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn encodes_response_envelope() {
        let mut reply = ResponseEnvelope::new(3, 0);
        reply.insert("/1", Response::ok(Value::from("done")));

        let bytes = MsgPackCodec.encode(&reply).unwrap();
        let back: ResponseEnvelope = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back, reply);
        assert_eq!(MsgPackCodec.content_type(), "application/x-msgpack");
    }
}
