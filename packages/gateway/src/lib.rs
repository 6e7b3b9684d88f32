//! Remoting gateway: service registry, request resolution, invocation,
//! fault translation, and an HTTP host for all of it.

pub mod config;
pub mod error;
pub mod failure;
pub mod fault;
pub mod gateway;
pub mod host;
pub mod network;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod service;

pub use config::GatewayConfig;
pub use error::{codes, HostError, RegistryError, RequestError};
pub use failure::ServiceFailure;
pub use fault::{FaultTranslator, Faultable};
pub use gateway::{Gateway, Processor};
pub use host::{build_envelope_pipeline, EnvelopePipeline, GatewayService};
pub use network::{HostConfig, MsgPackCodec, NetworkModule};
pub use registry::{ServiceKey, ServiceOptions, ServiceRegistry};
pub use request::{BoundRequest, RequestMeta};
pub use resolver::{RequestResolver, ResolvedTarget};
pub use service::{
    Member, MethodTable, Service, ServiceEntry, ServiceObject, ServiceResult, PRIVATE_PREFIX,
};
