//! Remoting core: envelopes, messages, responses, faults and the dynamic value type.

pub mod codec;
pub mod envelope;
pub mod fault;
pub mod value;

pub use codec::{CodecError, EnvelopeCodec, AMF_CONTENT_TYPE};
pub use envelope::{
    Envelope, Message, RequestEnvelope, Response, ResponseBody, ResponseEnvelope, Status,
    CREDENTIALS_HEADER, DESCRIBE_SERVICE_HEADER,
};
pub use fault::Fault;
pub use value::Value;
