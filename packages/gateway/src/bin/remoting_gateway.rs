//! Demo gateway server: registers a handful of services and serves them
//! over HTTP with the `MsgPack` codec until Ctrl-C.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use remoting_core::Value;
use remoting_gateway::{
    Gateway, GatewayConfig, HostConfig, Member, MethodTable, MsgPackCodec, NetworkModule, Service,
    ServiceFailure, ServiceObject, ServiceOptions, ServiceResult,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "remoting-gateway")]
#[command(about = "Serve registered remoting services over HTTP")]
struct GatewayArgs {
    /// Bind address
    #[arg(long, env = "GATEWAY_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Listen port (0 = random port)
    #[arg(short, long, env = "GATEWAY_PORT", default_value = "8080")]
    port: u16,

    /// Endpoint path for envelopes
    #[arg(long, env = "GATEWAY_PATH", default_value = "/gateway")]
    path: String,

    /// Leave error chains and backtraces out of faults
    #[arg(long, env = "GATEWAY_HIDE_FAULT_DETAILS")]
    hide_fault_details: bool,

    /// Per-envelope deadline in milliseconds
    #[arg(long, env = "GATEWAY_TIMEOUT_MS", default_value = "30000")]
    timeout_ms: u64,

    /// Envelopes processed at once before shedding load
    #[arg(long, env = "GATEWAY_MAX_CONCURRENT", default_value = "256")]
    max_concurrent: usize,
}

/// Per-call instance: every request sees a fresh counter.
#[derive(Default)]
struct Counter {
    hits: AtomicI64,
}

impl ServiceObject for Counter {
    fn member(&self, name: &str) -> Member {
        match name {
            "increment" => Member::Method,
            _ => Member::Missing,
        }
    }

    fn call_method(&self, _name: &str, _args: Vec<Value>) -> ServiceResult {
        Ok(Value::Int(self.hits.fetch_add(1, Ordering::Relaxed) + 1))
    }
}

fn int_args(args: &[Value]) -> Result<Vec<i64>, ServiceFailure> {
    args.iter()
        .map(|v| {
            v.as_i64().ok_or_else(|| {
                ServiceFailure::new("TypeError", format!("expected integer, got {v}"))
            })
        })
        .collect()
}

fn math() -> MethodTable {
    MethodTable::new("math")
        .field("version", "1.0")
        .method("add", |args| Ok(Value::Int(int_args(&args)?.iter().sum())))
        .method("divide", |args| match int_args(&args)?.as_slice() {
            [_, 0] => Err(ServiceFailure::new("ZeroDivisionError", "division by zero")),
            [a, b] => a
                .checked_div(*b)
                .map(Value::Int)
                .ok_or_else(|| ServiceFailure::new("OverflowError", "integer overflow in divide")),
            _ => Err(ServiceFailure::new("TypeError", "divide takes two arguments")),
        })
}

fn register_demo_services(gateway: &Gateway) -> anyhow::Result<()> {
    gateway.register_service(
        Service::function("echo", |args| Ok(Value::Array(args))),
        ServiceOptions::new().description("Returns its arguments"),
    )?;
    gateway.register_service(Service::object(math()), ServiceOptions::new())?;
    gateway.register_service(Service::class::<Counter>(), ServiceOptions::new())?;
    gateway.register_service(
        Service::function("whoami", |_| Ok(Value::from("admin"))),
        ServiceOptions::new()
            .name("secure.whoami")
            .authenticator(|user, password| user == Some("admin") && password == Some("admin")),
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = GatewayArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let gateway = Arc::new(Gateway::new(GatewayConfig {
        expose_fault_details: !args.hide_fault_details,
    }));
    register_demo_services(&gateway)?;
    info!(services = ?gateway.registry().names(), "services registered");

    let config = HostConfig {
        host: args.host,
        port: args.port,
        path: args.path,
        max_concurrent_envelopes: args.max_concurrent,
        envelope_timeout: Duration::from_millis(args.timeout_ms),
        ..HostConfig::default()
    };

    let mut module = NetworkModule::new(config, gateway, Arc::new(MsgPackCodec));
    module.start().await?;
    module
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
}
