//! Response formatting subsystem.
//!
//! # Data Flow
//! ```text
//! Accept header
//!     → negotiate.rs (media ranges ordered by quality)
//!     → registry.rs (acceptable set, formatter lookup)
//!     → Negotiated (request extension)
//!     → formatter serializes the reply / error body
//! ```
//!
//! # Design Decisions
//! - Only formatters set `Content-Type`; nothing else adds a default
//! - The wildcard formatter is JSON and always announces `application/json`
//! - Extra acceptable types without a formatter fall back to the wildcard

pub mod negotiate;
pub mod registry;

pub use negotiate::{negotiate, MediaRange};
pub use registry::{FormatError, FormatFn, Formatter, FormatterRegistry, Negotiated, WILDCARD};
