//! Failure events and their translation into responses.
//!
//! # Data Flow
//! ```text
//! stage / route / controller returns ApiError (or panics)
//!     → response carrying RaisedError
//!     → boundary.rs (outermost error stage)
//!     → mapper.rs: event → (kind, cache policy)
//!     → negotiated formatter renders TypedErrorResponse
//! ```
//!
//! # Design Decisions
//! - Built-in events map 1:1 to a fixed kind and cache policy
//! - Custom events resolve through caller declarations; unknown class names
//!   become Internal
//! - A response marked as already sent is never rendered again

pub mod boundary;
pub mod declaration;
pub mod mapper;

pub use boundary::{error_boundary, panic_response, ErrorBoundary};
pub use declaration::{ErrorHandlerDeclaration, ErrorHandlers};
pub use mapper::{ErrorMapper, LifecycleEvent, Resolution};
