//! Event-to-response mapping.

use axum::{
    body::Body,
    http::{header, response::Parts},
    response::Response,
};
use std::collections::HashMap;

use crate::errors::api_error::UNCAUGHT_EVENT;
use crate::errors::{ApiError, CachePolicy, ErrorKind, ResponseSent};
use crate::format::Formatter;
use crate::observability::metrics;

use super::declaration::ErrorHandlers;

/// A failure event the server subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    UncaughtException,
    NotFound,
    MethodNotAllowed,
    Unauthorized,
    Internal,
    VersionNotAllowed,
    /// Caller-named event resolved through [`ErrorHandlers`].
    Custom(String),
    /// An error of a kind with no dedicated event.
    Unsubscribed(ErrorKind),
}

impl LifecycleEvent {
    /// Names of the built-in events.
    pub const BUILT_IN: [&'static str; 6] = [
        UNCAUGHT_EVENT,
        "NotFound",
        "MethodNotAllowed",
        "Unauthorized",
        "Internal",
        "VersionNotAllowed",
    ];

    pub fn from_name(name: &str) -> Self {
        match name {
            UNCAUGHT_EVENT => LifecycleEvent::UncaughtException,
            "NotFound" => LifecycleEvent::NotFound,
            "MethodNotAllowed" => LifecycleEvent::MethodNotAllowed,
            "Unauthorized" => LifecycleEvent::Unauthorized,
            "Internal" | "InternalServer" => LifecycleEvent::Internal,
            "VersionNotAllowed" => LifecycleEvent::VersionNotAllowed,
            other => LifecycleEvent::Custom(other.to_string()),
        }
    }

    /// Event an error raises: its explicit name, else the one for its kind.
    pub fn for_error(err: &ApiError) -> Self {
        if let Some(name) = err.event_name() {
            return Self::from_name(name);
        }
        match err.kind() {
            ErrorKind::NotFound => LifecycleEvent::NotFound,
            ErrorKind::MethodNotAllowed => LifecycleEvent::MethodNotAllowed,
            ErrorKind::Unauthorized => LifecycleEvent::Unauthorized,
            ErrorKind::Internal => LifecycleEvent::Internal,
            ErrorKind::VersionNotAllowed => LifecycleEvent::VersionNotAllowed,
            other => LifecycleEvent::Unsubscribed(other),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LifecycleEvent::UncaughtException => UNCAUGHT_EVENT,
            LifecycleEvent::NotFound => "NotFound",
            LifecycleEvent::MethodNotAllowed => "MethodNotAllowed",
            LifecycleEvent::Unauthorized => "Unauthorized",
            LifecycleEvent::Internal => "Internal",
            LifecycleEvent::VersionNotAllowed => "VersionNotAllowed",
            LifecycleEvent::Custom(name) => name,
            LifecycleEvent::Unsubscribed(kind) => kind.code(),
        }
    }
}

/// How an event is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub event: LifecycleEvent,
    pub kind: ErrorKind,
    pub cache: CachePolicy,
}

/// Resolves raised errors to typed responses.
///
/// Built once at assembly from the caller's declarations; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ErrorMapper {
    custom: HashMap<String, ErrorKind>,
}

impl ErrorMapper {
    pub fn new(handlers: &ErrorHandlers) -> Self {
        let mut custom = HashMap::new();
        for (name, declaration) in handlers.iter() {
            if LifecycleEvent::BUILT_IN.contains(&name) {
                tracing::warn!(event = %name, "Custom handler shadows a built-in event; ignored");
                continue;
            }
            let kind = declaration.class().kind();
            tracing::debug!(event = %name, class = %declaration.class_name, kind = %kind, "Custom error handler registered");
            custom.insert(name.to_string(), kind);
        }
        Self { custom }
    }

    /// Names of the custom events subscribed to.
    pub fn custom_events(&self) -> impl Iterator<Item = &str> {
        self.custom.keys().map(String::as_str)
    }

    pub fn resolve(&self, err: &ApiError) -> Resolution {
        let event = LifecycleEvent::for_error(err);
        let (kind, cache) = match &event {
            LifecycleEvent::UncaughtException => (ErrorKind::Internal, CachePolicy::NoCache),
            LifecycleEvent::NotFound => (ErrorKind::NotFound, CachePolicy::Public { max_age_secs: 3600 }),
            LifecycleEvent::MethodNotAllowed => {
                (ErrorKind::MethodNotAllowed, CachePolicy::Public { max_age_secs: 3600 })
            }
            LifecycleEvent::Unauthorized => (ErrorKind::Unauthorized, CachePolicy::NoCache),
            LifecycleEvent::Internal => (ErrorKind::Internal, CachePolicy::NoCache),
            LifecycleEvent::VersionNotAllowed => {
                (ErrorKind::VersionNotAllowed, CachePolicy::Public { max_age_secs: 60 })
            }
            LifecycleEvent::Custom(name) => {
                let kind = self.custom.get(name).copied().unwrap_or_else(|| {
                    tracing::debug!(event = %name, "Undeclared custom event rendered as Internal");
                    ErrorKind::Internal
                });
                (kind, kind.cache_policy())
            }
            LifecycleEvent::Unsubscribed(kind) => (*kind, kind.cache_policy()),
        };
        Resolution { event, kind, cache }
    }

    /// Resolve `err`, then log and count its event.
    pub fn report(&self, err: &ApiError) -> Resolution {
        let resolution = self.resolve(err);
        if resolution.event == LifecycleEvent::UncaughtException {
            tracing::error!(error = %err.message(), "Uncaught exception");
        } else {
            tracing::debug!(event = %resolution.event.name(), error = %err, "Error event raised");
        }
        metrics::record_error(resolution.kind, resolution.event.name());
        resolution
    }

    /// Render `err` over the parts of the response that raised it.
    ///
    /// Headers set by earlier stages (CORS, request id) survive; entity
    /// headers are replaced.
    pub fn respond(&self, err: &ApiError, formatter: &Formatter, mut parts: Parts) -> Response {
        let resolution = self.report(err);

        let typed = err.to_typed(resolution.kind);
        let rendered = serde_json::to_value(&typed)
            .map_err(Into::into)
            .and_then(|value| formatter.format(&value));
        let (body, content_type) = match rendered {
            Ok(body) => (body, formatter.content_type_utf8()),
            Err(e) => {
                tracing::error!(error = %e, "Error formatter failed; falling back to JSON");
                let body = serde_json::to_vec(&typed).unwrap_or_default();
                (body.into(), header::HeaderValue::from_static("application/json; charset=utf-8"))
            }
        };

        parts.status = resolution.kind.status();
        for name in [header::CONTENT_LENGTH, header::CONTENT_ENCODING, header::ETAG] {
            parts.headers.remove(name);
        }
        parts.headers.insert(header::CACHE_CONTROL, resolution.cache.header_value());
        parts.headers.insert(header::CONTENT_TYPE, content_type);
        parts.extensions.insert(ResponseSent);

        Response::from_parts(parts, Body::from(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FormatterRegistry, Negotiated};
    use axum::http::StatusCode;

    fn mapper() -> ErrorMapper {
        ErrorMapper::new(
            &ErrorHandlers::new()
                .declare("ItemMissing", "NotFoundError")
                .declare("Teapot", "TeapotError")
                .declare("NotFound", "Conflict"),
        )
    }

    #[test]
    fn test_builtin_events() {
        let m = mapper();
        let r = m.resolve(&ApiError::not_found("gone"));
        assert_eq!(r.event, LifecycleEvent::NotFound);
        assert_eq!(r.cache, CachePolicy::Public { max_age_secs: 3600 });

        let r = m.resolve(&ApiError::uncaught("boom"));
        assert_eq!(r.event, LifecycleEvent::UncaughtException);
        assert_eq!(r.kind, ErrorKind::Internal);
        assert_eq!(r.cache, CachePolicy::NoCache);

        let r = m.resolve(&ApiError::version_not_allowed("v9"));
        assert_eq!(r.cache, CachePolicy::Public { max_age_secs: 60 });

        let r = m.resolve(&ApiError::unauthorized("who"));
        assert_eq!(r.cache, CachePolicy::NoCache);
    }

    #[test]
    fn test_custom_events() {
        let m = mapper();
        let r = m.resolve(&ApiError::event("ItemMissing", "no item 7"));
        assert_eq!(r.kind, ErrorKind::NotFound);
        assert_eq!(r.event, LifecycleEvent::Custom("ItemMissing".into()));
    }

    #[test]
    fn test_unrecognised_class_renders_internal() {
        let r = mapper().resolve(&ApiError::event("Teapot", "short and stout"));
        assert_eq!(r.kind, ErrorKind::Internal);
        assert_eq!(r.cache, CachePolicy::NoCache);
    }

    #[test]
    fn test_undeclared_custom_event_renders_internal() {
        let r = mapper().resolve(&ApiError::event("NeverDeclared", "?"));
        assert_eq!(r.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_builtin_name_cannot_be_redeclared() {
        let m = mapper();
        assert!(!m.custom_events().any(|e| e == "NotFound"));
        assert_eq!(m.resolve(&ApiError::not_found("x")).kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_unsubscribed_kind_keeps_its_policy() {
        let r = mapper().resolve(&ApiError::bad_request("bad").with_field("name"));
        assert_eq!(r.event, LifecycleEvent::Unsubscribed(ErrorKind::BadRequest));
        assert_eq!(r.kind, ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_respond_sets_headers_and_body() {
        let registry = FormatterRegistry::new(&[]);
        let formatter = registry.formatter_for(&Negotiated::wildcard());
        let (parts, _) = Response::new(Body::empty()).into_parts();

        let response = mapper().respond(&ApiError::not_found("/nope does not exist"), formatter, parts);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=3600");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json; charset=utf-8");
        assert!(response.extensions().get::<ResponseSent>().is_some());

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "NotFound");
        assert_eq!(json["message"], "/nope does not exist");
    }
}
