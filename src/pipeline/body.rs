//! Request body parsing stage.
//!
//! Buffers the body up to the configured limit, parses JSON and urlencoded
//! payloads, and puts the bytes back so controllers can still read them.

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::BodyParserConfig;
use crate::errors::ApiError;

/// Parsed request body, stored in request extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBody {
    pub raw: Bytes,
    pub content_type: Option<String>,
    /// Structured value for JSON and urlencoded payloads.
    pub value: Option<Value>,
}

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Parse buffered bytes according to the request content type.
pub fn parse(raw: Bytes, content_type: Option<&str>) -> Result<ParsedBody, ApiError> {
    let media_type = content_type.map(essence);
    let value = match media_type.as_deref() {
        _ if raw.is_empty() => None,
        Some(m) if m == "application/json" || m.ends_with("+json") => Some(
            serde_json::from_slice::<Value>(&raw)
                .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e)))?,
        ),
        Some("application/x-www-form-urlencoded") => {
            let mut map = Map::new();
            for (key, value) in url::form_urlencoded::parse(&raw) {
                map.insert(key.into_owned(), Value::String(value.into_owned()));
            }
            Some(Value::Object(map))
        }
        _ => None,
    };

    Ok(ParsedBody {
        raw,
        content_type: content_type.map(str::to_string),
        value,
    })
}

pub async fn parse_body(
    State(config): State<Arc<BodyParserConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    let raw = match axum::body::to_bytes(body, config.max_bytes).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(error = %e, limit = config.max_bytes, "Request body rejected");
            return ApiError::bad_request(format!(
                "Request body exceeds {} bytes or could not be read",
                config.max_bytes
            ))
            .into_response();
        }
    };

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match parse(raw.clone(), content_type.as_deref()) {
        Ok(parsed) => {
            parts.extensions.insert(parsed);
            next.run(Request::from_parts(parts, Body::from(raw))).await
        }
        Err(err) => err.into_response(),
    }
}
