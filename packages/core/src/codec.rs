//! Codec seam between raw transport bytes and envelopes.
//!
//! The gateway never encodes or decodes itself; a transport adapter is
//! handed an [`EnvelopeCodec`] and calls it on either side of
//! `process_envelope`.

use crate::envelope::{RequestEnvelope, ResponseEnvelope};

/// Content type of AMF remoting payloads.
pub const AMF_CONTENT_TYPE: &str = "application/x-amf";

/// Errors raised while converting between bytes and envelopes.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed envelope: {0}")]
    Decode(String),
    #[error("failed to encode envelope: {0}")]
    Encode(String),
}

/// Decode/encode pair used at the transport boundary.
pub trait EnvelopeCodec: Send + Sync {
    /// Decodes a request envelope from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Decode` if the payload is not a valid envelope.
    fn decode(&self, bytes: &[u8]) -> Result<RequestEnvelope, CodecError>;

    /// Encodes a response envelope to raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encode` if a value cannot be represented.
    fn encode(&self, envelope: &ResponseEnvelope) -> Result<Vec<u8>, CodecError>;

    /// Content type sent with encoded responses.
    fn content_type(&self) -> &'static str {
        AMF_CONTENT_TYPE
    }
}
