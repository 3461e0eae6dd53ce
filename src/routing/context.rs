//! Per-request state handed through route middleware to the controller.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header, Extensions, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::errors::ApiError;
use crate::format::Negotiated;
use crate::pipeline::{Authorization, ParsedBody, QueryParams};

/// Request data plus the response headers route middleware has set.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    extensions: Extensions,
    params: HashMap<String, String>,
    body: Body,
    response_headers: HeaderMap,
}

impl RequestContext {
    pub fn new(request: Request, params: HashMap<String, String>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            extensions: parts.extensions,
            params,
            body,
            response_headers: HeaderMap::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text, if present and printable.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Path parameter captured by the route pattern.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn query(&self) -> Option<&QueryParams> {
        self.extensions.get::<QueryParams>()
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query().and_then(|q| q.get(name))
    }

    pub fn authorization(&self) -> Option<&Authorization> {
        self.extensions.get::<Authorization>()
    }

    /// Body parsed by the body parser stage, when it is enabled.
    pub fn parsed_body(&self) -> Option<&ParsedBody> {
        self.extensions.get::<ParsedBody>()
    }

    /// Deserialize the parsed body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let value = self
            .parsed_body()
            .and_then(|b| b.value.clone())
            .ok_or_else(|| ApiError::bad_request("Request body is missing or not structured"))?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
    }

    /// Take the raw request body. Later calls yield an empty body.
    pub fn take_body(&mut self) -> Body {
        std::mem::replace(&mut self.body, Body::empty())
    }

    pub fn negotiated(&self) -> Negotiated {
        self.extensions
            .get::<Negotiated>()
            .cloned()
            .unwrap_or_else(Negotiated::wildcard)
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Header to add to the eventual response.
    pub fn set_response_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response_headers.insert(name, value);
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub(crate) fn take_response_headers(&mut self) -> HeaderMap {
        std::mem::take(&mut self.response_headers)
    }

    #[cfg(test)]
    pub(crate) fn for_test(path: &str) -> Self {
        let request = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("valid test request");
        Self::new(request, HashMap::new())
    }
}

/// What a reply carries as its body.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Empty,
    /// Serialized by the negotiated formatter.
    Data(Value),
    /// Sent verbatim with its own content type.
    Raw { content_type: HeaderValue, bytes: Bytes },
}

/// Controller result.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: ReplyBody,
    /// Error raised after the reply was committed.
    raised: Option<ApiError>,
}

impl Reply {
    /// Reply with `data`, serialized later by the negotiated formatter.
    pub fn new<T: Serialize + ?Sized>(status: StatusCode, data: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(data)
            .map_err(|e| ApiError::internal(format!("Failed to serialize response: {}", e)))?;
        Ok(Self {
            status,
            headers: HeaderMap::new(),
            body: ReplyBody::Data(value),
            raised: None,
        })
    }

    /// `200 OK` with `data`.
    pub fn ok<T: Serialize + ?Sized>(data: &T) -> Result<Self, ApiError> {
        Self::new(StatusCode::OK, data)
    }

    /// `201 Created` with `data`.
    pub fn created<T: Serialize + ?Sized>(data: &T) -> Result<Self, ApiError> {
        Self::new(StatusCode::CREATED, data)
    }

    /// `204 No Content`.
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: ReplyBody::Empty,
            raised: None,
        }
    }

    /// Plain text, bypassing the formatters.
    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ReplyBody::Raw {
                content_type: HeaderValue::from_static("text/plain"),
                bytes: Bytes::from(text.into()),
            },
            raised: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Set a response header; overrides headers set by guards.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Shorthand for a `Location` header.
    pub fn with_location(self, location: &str) -> Result<Self, ApiError> {
        let value = HeaderValue::from_str(location)
            .map_err(|_| ApiError::internal(format!("Invalid location '{}'", location)))?;
        Ok(self.with_header(header::LOCATION, value))
    }

    /// Send this reply, then raise `err` anyway.
    ///
    /// The client gets the reply unchanged. The error still reaches the
    /// error boundary, which resolves and logs its event but never writes a
    /// second response.
    pub fn raising(mut self, err: ApiError) -> Self {
        self.raised = Some(err);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ReplyBody {
        &self.body
    }

    pub fn raised(&self) -> Option<&ApiError> {
        self.raised.as_ref()
    }

    pub(crate) fn into_parts(self) -> (StatusCode, HeaderMap, ReplyBody, Option<ApiError>) {
        (self.status, self.headers, self.body, self.raised)
    }
}
