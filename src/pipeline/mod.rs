//! Request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! ServerOptions + RuntimeEnv
//!     → plan.rs (ordered Stage list, conditional inclusion)
//!     → assembler.rs (each stage wraps everything after it)
//!     → axum Router ready to serve
//!
//! Request, outermost first:
//!     request id → access log → error boundary → panic capture
//!     → accept → user agent → sanitize path → CORS → authorization
//!     → [body] → query → compression → etag → conditional → routes
//! ```
//!
//! # Design Decisions
//! - The order is data (`Vec<Stage>`), so it is testable without a socket
//! - Disabled stages are omitted, never installed as pass-throughs
//! - Authorization runs before any body is read
//! - Stages fail by returning an `ApiError` response; the error boundary
//!   renders it once

pub mod accept;
pub mod assembler;
pub mod authorization;
pub mod body;
pub mod conditional;
pub mod cors;
pub mod etag;
pub mod plan;
pub mod query;
pub mod sanitize;
pub mod user_agent;

pub use assembler::Assembler;
pub use authorization::{Authorization, BasicCredentials};
pub use body::ParsedBody;
pub use etag::EtagPolicy;
pub use plan::{plan, Stage};
pub use query::QueryParams;
