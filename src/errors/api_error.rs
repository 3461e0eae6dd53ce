//! Request-level errors and the typed body they render to.

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::kind::ErrorKind;

/// Event name used for failures that escaped a handler as a panic.
pub(crate) const UNCAUGHT_EVENT: &str = "uncaughtException";

/// Error raised by a pipeline stage, route middleware or controller.
///
/// Turning it into a response does not render a body: the response only
/// carries a [`RaisedError`] marker which the error boundary resolves against
/// the registered events.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    user_message: Option<String>,
    field: Option<String>,
    event: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            user_message: None,
            field: None,
            event: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed, message)
    }

    pub fn not_acceptable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAcceptable, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn version_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::VersionNotAllowed, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    /// Raise a named custom event. The kind is resolved by the error-handler
    /// declarations at render time.
    pub fn event(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event: Some(name.into()),
            ..Self::internal(message)
        }
    }

    /// A failure nothing handled (a panic in a stage or controller).
    pub fn uncaught(message: impl Into<String>) -> Self {
        Self::event(UNCAUGHT_EVENT, message)
    }

    pub fn with_user_message(mut self, user_message: impl Into<String>) -> Self {
        self.user_message = Some(user_message.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn user_message(&self) -> Option<&str> {
        self.user_message.as_deref()
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Explicit event name, if one was raised.
    pub fn event_name(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// Body for this error rendered as `kind`.
    pub fn to_typed(&self, kind: ErrorKind) -> TypedErrorResponse {
        TypedErrorResponse {
            kind,
            code: kind.code(),
            message: self.message.clone(),
            user_message: self.user_message.clone(),
            field: self.field.clone(),
        }
    }
}

/// Marker carried by a response whose error still needs rendering.
#[derive(Debug, Clone)]
pub struct RaisedError(pub ApiError);

/// Marker for a response that has already been committed to the client.
///
/// The error boundary never renders over a response carrying it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseSent;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = self.kind.status();
        response.extensions_mut().insert(RaisedError(self));
        response
    }
}

/// Serialized error body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedErrorResponse {
    #[serde(skip)]
    kind: ErrorKind,
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl TypedErrorResponse {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
