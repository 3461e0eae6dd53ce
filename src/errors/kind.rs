//! Error kinds, declarable classes and their cache policies.

use axum::http::{HeaderValue, StatusCode};
use std::fmt;

/// Cache directive attached to an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Request or state dependent; must never be cached.
    NoCache,
    /// Stable negative result, cacheable by shared caches.
    Public { max_age_secs: u32 },
}

impl CachePolicy {
    /// Value for the `Cache-Control` header.
    pub fn header_value(&self) -> HeaderValue {
        match self {
            CachePolicy::NoCache => HeaderValue::from_static("no-cache"),
            CachePolicy::Public { max_age_secs } => {
                HeaderValue::from_str(&format!("public, max-age={}", max_age_secs))
                    .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
            }
        }
    }
}

/// Every error response the server can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    Conflict,
    VersionNotAllowed,
    Internal,
    ServiceUnavailable,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::VersionNotAllowed => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable code written into the error body.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::MethodNotAllowed => "MethodNotAllowed",
            ErrorKind::NotAcceptable => "NotAcceptable",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::VersionNotAllowed => "InvalidVersion",
            ErrorKind::Internal => "Internal",
            ErrorKind::ServiceUnavailable => "ServiceUnavailable",
        }
    }

    /// Default cache directive for responses of this kind.
    pub fn cache_policy(self) -> CachePolicy {
        match self {
            ErrorKind::NotFound | ErrorKind::MethodNotAllowed => {
                CachePolicy::Public { max_age_secs: 3600 }
            }
            ErrorKind::VersionNotAllowed => CachePolicy::Public { max_age_secs: 60 },
            _ => CachePolicy::NoCache,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error classes a custom error-handler declaration may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    NotFound,
    BadRequest,
    Forbidden,
    ServiceUnavailable,
    Unauthorized,
    Conflict,
    Internal,
}

impl ErrorClass {
    /// Resolve a declared class name.
    ///
    /// Accepts the bare name or the `Error`-suffixed form (`NotFound`,
    /// `NotFoundError`). Anything unrecognised resolves to `Internal`.
    pub fn from_name(name: &str) -> Self {
        let bare = name.trim();
        let bare = bare.strip_suffix("Error").unwrap_or(bare);
        match bare {
            "NotFound" => ErrorClass::NotFound,
            "BadRequest" => ErrorClass::BadRequest,
            "Forbidden" => ErrorClass::Forbidden,
            "ServiceUnavailable" => ErrorClass::ServiceUnavailable,
            "Unauthorized" => ErrorClass::Unauthorized,
            "Conflict" => ErrorClass::Conflict,
            _ => ErrorClass::Internal,
        }
    }

    pub fn kind(self) -> ErrorKind {
        match self {
            ErrorClass::NotFound => ErrorKind::NotFound,
            ErrorClass::BadRequest => ErrorKind::BadRequest,
            ErrorClass::Forbidden => ErrorKind::Forbidden,
            ErrorClass::ServiceUnavailable => ErrorKind::ServiceUnavailable,
            ErrorClass::Unauthorized => ErrorKind::Unauthorized,
            ErrorClass::Conflict => ErrorKind::Conflict,
            ErrorClass::Internal => ErrorKind::Internal,
        }
    }
}
