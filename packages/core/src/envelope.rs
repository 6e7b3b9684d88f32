//! Request and response envelope types.
//!
//! An envelope is the protocol-level container handed over by a codec: a
//! protocol version, a client type, and an ordered set of named bodies.
//! Request envelopes carry [`Message`] bodies, response envelopes carry
//! [`Response`] bodies stored under the same names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::fault::Fault;
use crate::value::Value;

/// Header that carries a `{ userid, password }` credentials map.
pub const CREDENTIALS_HEADER: &str = "Credentials";

/// Header marking a service introspection request.
pub const DESCRIBE_SERVICE_HEADER: &str = "DescribeService";

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Ordered, name-keyed collection of bodies plus protocol metadata.
///
/// Names are unique: inserting an existing name replaces its body in place,
/// keeping the original position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub amf_version: u16,
    pub client_type: u16,
    bodies: Vec<(String, T)>,
}

/// Envelope of inbound messages.
pub type RequestEnvelope = Envelope<Message>;

/// Envelope of outbound responses.
pub type ResponseEnvelope = Envelope<Response>;

impl<T> Envelope<T> {
    /// Creates an empty envelope with the given protocol metadata.
    #[must_use]
    pub fn new(amf_version: u16, client_type: u16) -> Self {
        Self {
            amf_version,
            client_type,
            bodies: Vec::new(),
        }
    }

    /// Creates an empty envelope carrying the same metadata as `other`.
    #[must_use]
    pub fn reply_to<U>(other: &Envelope<U>) -> Self {
        Self::new(other.amf_version, other.client_type)
    }

    /// Stores `body` under `name`, replacing any existing body of that name.
    pub fn insert(&mut self, name: impl Into<String>, body: T) {
        let name = name.into();
        if let Some(slot) = self.bodies.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = body;
        } else {
            self.bodies.push((name, body));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.bodies.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates `(name, body)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.bodies.iter().map(|(n, b)| (n.as_str(), b))
    }

    /// Body names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bodies.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl<T> Default for Envelope<T> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One remote-call unit: a target address, headers and positional arguments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    /// `"service"` or `"service.method"`.
    pub target: String,
    #[serde(default)]
    pub headers: HashMap<String, Value>,
    #[serde(default)]
    pub body: Vec<Value>,
}

impl Message {
    /// Creates a message with no headers.
    #[must_use]
    pub fn new(target: impl Into<String>, body: Vec<Value>) -> Self {
        Self {
            target: target.into(),
            headers: HashMap::new(),
            body,
        }
    }

    /// Adds a header, builder style.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attaches a credentials header with both `userid` and `password`.
    #[must_use]
    pub fn with_credentials(self, userid: &str, password: &str) -> Self {
        let creds: Value = [
            ("userid".to_string(), userid),
            ("password".to_string(), password),
        ]
        .into_iter()
        .collect();
        self.with_header(CREDENTIALS_HEADER, creds)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }

    /// Whether the message asks for service introspection.
    #[must_use]
    pub fn is_describe_request(&self) -> bool {
        self.headers.contains_key(DESCRIBE_SERVICE_HEADER)
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Terminal state of a processed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Error,
}

/// Payload of a response: the call's return value or a fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseBody {
    Result(Value),
    Fault(Fault),
}

/// Outcome of one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    pub body: ResponseBody,
}

impl Response {
    /// Successful response carrying `value`.
    #[must_use]
    pub fn ok(value: Value) -> Self {
        Self {
            status: Status::Ok,
            body: ResponseBody::Result(value),
        }
    }

    /// Error response carrying `fault`.
    #[must_use]
    pub fn error(fault: Fault) -> Self {
        Self {
            status: Status::Error,
            body: ResponseBody::Fault(fault),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// The fault, when this is an error response.
    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        match &self.body {
            ResponseBody::Fault(f) => Some(f),
            ResponseBody::Result(_) => None,
        }
    }

    /// The result value, when this is a successful response.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Result(v) => Some(v),
            ResponseBody::Fault(_) => None,
        }
    }
}
