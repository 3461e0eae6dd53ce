//! Error taxonomy subsystem.
//!
//! # Data Flow
//! ```text
//! controller / middleware stage
//!     → ApiError (kind + message + optional user message / field / event)
//!     → into_response(): status + RaisedError marker, no body
//!     → events::boundary renders the marker exactly once
//! ```
//!
//! # Design Decisions
//! - The set of kinds is closed; status, code and cache policy are fixed per kind
//! - Declarable classes are a subset of kinds and resolve by name
//! - Unknown class names resolve to Internal instead of failing

pub mod api_error;
pub mod kind;

pub use api_error::{ApiError, RaisedError, ResponseSent, TypedErrorResponse};
pub use kind::{CachePolicy, ErrorClass, ErrorKind};
