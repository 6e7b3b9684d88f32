//! Hosting configuration for the HTTP transport.

use std::time::Duration;

/// Settings for the HTTP listener and the envelope pipeline.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Path the gateway endpoint is mounted at.
    pub path: String,
    /// Maximum envelopes processed at once. Further envelopes get 503.
    pub max_concurrent_envelopes: usize,
    /// Deadline for processing a single envelope.
    pub envelope_timeout: Duration,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            path: "/gateway".to_string(),
            max_concurrent_envelopes: 256,
            envelope_timeout: Duration::from_secs(30),
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_config_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 0);
        assert_eq!(config.path, "/gateway");
        assert_eq!(config.max_concurrent_envelopes, 256);
        assert_eq!(config.envelope_timeout, Duration::from_secs(30));
        assert_eq!(config.max_body_bytes, 4_194_304);
    }
}
