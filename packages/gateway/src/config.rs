/// Behaviour settings for the request pipeline.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Fill `Fault::details` with the error chain and captured backtrace.
    /// Turn off to keep diagnostics out of responses sent to untrusted clients.
    pub expose_fault_details: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            expose_fault_details: true,
        }
    }
}
