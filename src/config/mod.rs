//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! options file (TOML)
//!     → loader.rs (parse & deserialize, unknown keys rejected)
//!     → validation.rs (semantic checks)
//!     → ServerOptions (validated, immutable)
//!
//! process environment
//!     → env.rs (PORT, APP_ENV / NODE_ENV read once)
//!     → RuntimeEnv passed explicitly to the assembler and runner
//! ```
//!
//! # Design Decisions
//! - Options are immutable once the server is assembled
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use env::{EnvError, RuntimeEnv};
pub use loader::{load_options, parse_options, ConfigError};
pub use schema::{
    AuthorizationConfig, BodyParserConfig, CorsConfig, LoggingConfig, MetricsConfig,
    ServerOptions, SwaggerConfig,
};
pub use validation::{validate_options, ValidationError};
