//! HTTP API server factory.
//!
//! Assembles a runnable server from a declarative route table, a table of
//! custom error events and a small options structure. Every server built
//! here shares the same request pipeline: content negotiation, CORS,
//! authorization and body/query parsing, compression, conditional caching,
//! route dispatch and error-to-response translation.

pub mod config;
pub mod errors;
pub mod events;
pub mod format;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod routing;
pub mod server;

pub use config::{RuntimeEnv, ServerOptions};
pub use errors::{ApiError, ErrorKind};
pub use events::ErrorHandlers;
pub use lifecycle::Shutdown;
pub use routing::{AssemblyError, Controller, Middleware, Reply, RequestContext, RouteDescriptor, RouteTable};
pub use server::ApiServer;
