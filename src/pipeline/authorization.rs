//! Authorization header parsing stage.
//!
//! The stage only parses; deciding whether a route needs credentials is the
//! job of the route's auth middleware. A present but malformed header, or one
//! using a scheme the server does not accept, is rejected as Unauthorized
//! before any payload is read.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use crate::config::AuthorizationConfig;
use crate::errors::ApiError;

/// Decoded `Basic` credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Parsed `Authorization` header, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub scheme: String,
    pub credentials: String,
    pub basic: Option<BasicCredentials>,
}

impl Authorization {
    /// Bearer token, if the scheme is `Bearer`.
    pub fn bearer(&self) -> Option<&str> {
        self.scheme
            .eq_ignore_ascii_case("bearer")
            .then_some(self.credentials.as_str())
    }
}

/// Parse a raw header value against the accepted schemes.
pub fn parse(raw: &str, config: &AuthorizationConfig) -> Result<Authorization, ApiError> {
    let (scheme, credentials) = raw
        .trim()
        .split_once(' ')
        .map(|(s, c)| (s.trim(), c.trim()))
        .filter(|(s, c)| !s.is_empty() && !c.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Authorization header is malformed"))?;

    if !config.schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
        return Err(ApiError::unauthorized(format!(
            "{} authorization scheme is not supported",
            scheme
        )));
    }

    let basic = if scheme.eq_ignore_ascii_case("basic") {
        Some(decode_basic(credentials)?)
    } else {
        None
    };

    Ok(Authorization {
        scheme: scheme.to_string(),
        credentials: credentials.to_string(),
        basic,
    })
}

fn decode_basic(encoded: &str) -> Result<BasicCredentials, ApiError> {
    let invalid = || ApiError::unauthorized("BasicAuth content is invalid.");
    let decoded = STANDARD.decode(encoded).map_err(|_| invalid())?;
    let decoded = String::from_utf8(decoded).map_err(|_| invalid())?;
    let (username, password) = decoded.split_once(':').ok_or_else(invalid)?;
    Ok(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

pub async fn parse_authorization(
    State(config): State<Arc<AuthorizationConfig>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(raw) = req.headers().get(header::AUTHORIZATION) else {
        return next.run(req).await;
    };

    let parsed = raw
        .to_str()
        .map_err(|_| ApiError::unauthorized("Authorization header is not valid text"))
        .and_then(|raw| parse(raw, &config));

    match parsed {
        Ok(authorization) => {
            req.extensions_mut().insert(authorization);
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(error = %err, "Rejected authorization header");
            err.into_response()
        }
    }
}
