use serde::{Deserialize, Serialize};

/// Structured, serializable representation of a failed call.
///
/// `details` is diagnostic output for operators (a formatted error chain
/// and backtrace) and is empty when the gateway does not expose it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// Stable machine-readable identifier (e.g. `Service.ResourceNotFound`).
    pub code: String,
    /// Human-readable message.
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl Fault {
    /// Creates a fault without diagnostic details.
    #[must_use]
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            details: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}
