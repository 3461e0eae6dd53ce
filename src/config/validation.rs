//! Options validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (body limit > 0, parsable addresses)
//! - Detect contradictory settings (credentials with a wildcard origin)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerOptions → Result<(), Vec<ValidationError>>
//! - Runs before options are accepted into the assembler

use std::net::SocketAddr;

use crate::config::schema::ServerOptions;

/// A single semantic problem in the options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An `acceptable` entry is not of the form `type/subtype`.
    InvalidMediaType(String),
    /// The body parser limit is zero.
    ZeroBodyLimit,
    /// No authorization scheme is accepted.
    NoAuthorizationSchemes,
    /// Swagger is enabled without a UI directory.
    MissingSwaggerUiDir,
    /// CORS credentials were enabled together with a wildcard origin.
    CredentialsWithWildcardOrigin,
    /// The metrics exporter address does not parse.
    InvalidMetricsAddress(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidMediaType(m) => write!(f, "invalid acceptable media type '{}'", m),
            ValidationError::ZeroBodyLimit => write!(f, "body_parser.max_bytes must be greater than 0"),
            ValidationError::NoAuthorizationSchemes => {
                write!(f, "authorization.schemes must not be empty")
            }
            ValidationError::MissingSwaggerUiDir => {
                write!(f, "swagger.ui_dir must be set when swagger is enabled")
            }
            ValidationError::CredentialsWithWildcardOrigin => {
                write!(f, "cors.credentials requires explicit allowed_origins")
            }
            ValidationError::InvalidMetricsAddress(a) => {
                write!(f, "invalid metrics address '{}'", a)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check options for semantic problems.
pub fn validate_options(options: &ServerOptions) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for media_type in &options.acceptable {
        let valid = media_type
            .split_once('/')
            .map(|(main, sub)| !main.trim().is_empty() && !sub.trim().is_empty())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidMediaType(media_type.clone()));
        }
    }

    if options.body_parser.enabled && options.body_parser.max_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if options.authorization.schemes.is_empty() {
        errors.push(ValidationError::NoAuthorizationSchemes);
    }

    if options.swagger.enabled && options.swagger.ui_dir.as_os_str().is_empty() {
        errors.push(ValidationError::MissingSwaggerUiDir);
    }

    if options.cors.credentials
        && (options.cors.allowed_origins.is_empty()
            || options.cors.allowed_origins.iter().any(|o| o == "*"))
    {
        errors.push(ValidationError::CredentialsWithWildcardOrigin);
    }

    if options.metrics.enabled && options.metrics.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(options.metrics.address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
