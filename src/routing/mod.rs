//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! RouteTable (method → ordered RouteDescriptor list)
//!     → router.rs (alias methods, convert paths, default preconditions,
//!                  synthesize HEAD for GET, reject duplicates)
//!     → Registration[] (immutable)
//!     → axum Router + builtin.rs (health, swagger, fallbacks)
//!
//! Per request:
//!     endpoint.rs: version check → auth → cache → precondition → controller
//!     → render with the negotiated formatter
//! ```
//!
//! # Design Decisions
//! - Descriptors are consumed once at assembly; nothing is mutated afterwards
//! - A missing controller fails assembly instead of skipping the route
//! - Guards pass the `RequestContext` along or fail with an `ApiError`

pub mod builtin;
pub mod context;
pub mod descriptor;
pub mod endpoint;
pub mod handler;
pub mod router;

pub use context::{Reply, ReplyBody, RequestContext};
pub use descriptor::{RouteDescriptor, RouteOptions, RouteTable};
pub use endpoint::CompiledRoute;
pub use handler::{Controller, Middleware};
pub use router::{build_router, compile, AssemblyError, Registration};
