//! HTTP transport: axum handlers, HTTP middleware and server lifecycle.

pub mod codec;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod module;

pub use codec::{MsgPackCodec, MSGPACK_CONTENT_TYPE};
pub use config::HostConfig;
pub use handlers::AppState;
pub use module::NetworkModule;
