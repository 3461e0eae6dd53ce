//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! RuntimeEnv + ServerOptions
//!     → runner.rs (resolve port: env > options > 3000)
//!     → bind 0.0.0.0:port → callback(Ok(port) | Err)
//!     → serve until Shutdown fires
//!
//! Shutdown (shutdown.rs):
//!     trigger() or Ctrl+C → stop accepting → drain in-flight requests
//! ```
//!
//! # Design Decisions
//! - Fail fast: a bind failure is returned, never retried
//! - Environment is read once by the caller and passed in

pub mod runner;
pub mod shutdown;

pub use runner::{resolve_port, run, serve, ServerError, DEFAULT_PORT};
pub use shutdown::Shutdown;
