//! Compiled routes: guard chain, controller call and reply rendering.

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, Method},
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{ApiError, RaisedError, ResponseSent};
use crate::format::{Formatter, FormatterRegistry};
use crate::pipeline::etag::{self, EtagPolicy};

use super::context::{Reply, ReplyBody, RequestContext};
use super::descriptor::{RouteDescriptor, RouteOptions};
use super::handler::{Controller, Middleware};

/// Request headers carrying the requested API version.
pub const VERSION_HEADERS: [&str; 2] = ["accept-version", "x-api-version"];

/// A descriptor after defaulting; immutable and shared by its GET and HEAD
/// registrations.
#[derive(Debug)]
pub struct CompiledRoute {
    options: RouteOptions,
    auth: Option<Middleware>,
    cache: Option<Middleware>,
    precondition: Middleware,
    controller: Controller,
}

impl CompiledRoute {
    /// `None` when the descriptor has no controller.
    pub fn compile(descriptor: RouteDescriptor) -> Option<Self> {
        let controller = descriptor.controller?;
        Some(Self {
            options: descriptor.options,
            auth: descriptor.auth_method,
            cache: descriptor.cache,
            precondition: descriptor.precondition.unwrap_or_else(Middleware::pass),
            controller,
        })
    }

    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    fn check_version(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        if self.options.versions.is_empty() {
            return Ok(());
        }
        let requested = VERSION_HEADERS
            .iter()
            .find_map(|name| headers.get(*name))
            .and_then(|v| v.to_str().ok())
            .map(str::trim);

        match requested {
            None | Some("*") => Ok(()),
            Some(requested) => {
                let allowed = self
                    .options
                    .versions
                    .iter()
                    .any(|v| v == "*" || v == requested);
                if allowed {
                    Ok(())
                } else {
                    Err(ApiError::version_not_allowed(format!(
                        "{} is not supported by {}",
                        requested, self.options.path
                    )))
                }
            }
        }
    }

    /// Run auth, cache and precondition in order, then the controller.
    ///
    /// Returns the headers set by the guards alongside the reply.
    pub async fn dispatch(&self, mut ctx: RequestContext) -> Result<(HeaderMap, Reply), ApiError> {
        self.check_version(ctx.headers())?;

        if let Some(auth) = &self.auth {
            ctx = auth.run(ctx).await?;
        }
        if let Some(cache) = &self.cache {
            ctx = cache.run(ctx).await?;
        }
        ctx = self.precondition.run(ctx).await?;

        let headers = ctx.take_response_headers();
        let reply = self.controller.call(ctx).await?;
        Ok((headers, reply))
    }
}

/// Axum-facing entry point for one registration.
pub(crate) async fn handle(
    route: Arc<CompiledRoute>,
    formatters: Arc<FormatterRegistry>,
    req: Request,
    params: HashMap<String, String>,
) -> Result<Response, ApiError> {
    let method = req.method().clone();
    let tagging = req.extensions().get::<EtagPolicy>().is_some();

    let ctx = RequestContext::new(req, params);
    let formatter = formatters.formatter_for(&ctx.negotiated()).clone();

    let (headers, reply) = route.dispatch(ctx).await?;
    render(reply, headers, &formatter, &method, tagging)
}

/// Serialize a reply. Reply headers win over guard headers.
///
/// Bodies are tagged here when etags are on, since HEAD bodies are gone by
/// the time the response reaches the etag stage.
pub fn render(
    reply: Reply,
    mut headers: HeaderMap,
    formatter: &Formatter,
    method: &Method,
    tagging: bool,
) -> Result<Response, ApiError> {
    let (status, reply_headers, body, raised) = reply.into_parts();

    let (content_type, bytes) = match body {
        ReplyBody::Empty => (None, None),
        ReplyBody::Data(value) => {
            let bytes = formatter.format(&value).map_err(|e| {
                tracing::error!(error = %e, "Failed to format reply");
                ApiError::internal(e.to_string())
            })?;
            (Some(formatter.content_type().clone()), Some(bytes))
        }
        ReplyBody::Raw { content_type, bytes } => (Some(content_type), Some(bytes)),
    };

    if let Some(content_type) = content_type {
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    for (name, value) in reply_headers.iter() {
        headers.insert(name.clone(), value.clone());
    }

    if tagging && etag::is_taggable(method, status) && !headers.contains_key(header::ETAG) {
        if let Some(bytes) = &bytes {
            headers.insert(header::ETAG, etag::compute(bytes));
        }
    }

    let mut response = Response::new(bytes.map(Body::from).unwrap_or_else(Body::empty));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    if let Some(err) = raised {
        response.extensions_mut().insert(ResponseSent);
        response.extensions_mut().insert(RaisedError(err));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use axum::http::{HeaderValue, StatusCode};
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Middleware {
        let log = log.clone();
        Middleware::from_fn(move |ctx| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(name);
                Ok(ctx)
            }
        })
    }

    fn echo_path() -> Controller {
        Controller::from_fn(|ctx| async move { Reply::ok(&serde_json::json!({ "path": ctx.path() })) })
    }

    #[tokio::test]
    async fn test_guard_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let controller_log = log.clone();
        let route = CompiledRoute::compile(
            RouteDescriptor::new("/items")
                .precondition(recorder(&log, "precondition"))
                .cache(recorder(&log, "cache"))
                .auth(recorder(&log, "auth"))
                .controller(Controller::from_fn(move |_| {
                    let log = controller_log.clone();
                    async move {
                        log.lock().unwrap().push("controller");
                        Ok(Reply::no_content())
                    }
                })),
        )
        .unwrap();

        route.dispatch(RequestContext::for_test("/items")).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["auth", "cache", "precondition", "controller"]);
    }

    #[tokio::test]
    async fn test_failing_guard_short_circuits() {
        let route = CompiledRoute::compile(
            RouteDescriptor::new("/items")
                .precondition(Middleware::from_fn(|_| async {
                    Err(ApiError::conflict("Item is locked"))
                }))
                .controller(Controller::from_fn(|_| async {
                    Err(ApiError::internal("controller must not run"))
                })),
        )
        .unwrap();

        let err = route.dispatch(RequestContext::for_test("/items")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_missing_controller() {
        assert!(CompiledRoute::compile(RouteDescriptor::new("/items")).is_none());
    }

    #[test]
    fn test_version_check() {
        let route = CompiledRoute::compile(
            RouteDescriptor::new(RouteOptions::new("/v").version("1.0.0")).controller(echo_path()),
        )
        .unwrap();

        let mut headers = HeaderMap::new();
        assert!(route.check_version(&headers).is_ok());

        headers.insert("accept-version", HeaderValue::from_static("1.0.0"));
        assert!(route.check_version(&headers).is_ok());

        headers.insert("accept-version", HeaderValue::from_static("2.0.0"));
        let err = route.check_version(&headers).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionNotAllowed);
    }

    #[test]
    fn test_render_merges_headers_and_tags() {
        let formatters = FormatterRegistry::new(&[]);
        let mut guard_headers = HeaderMap::new();
        guard_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        guard_headers.insert("x-guard", HeaderValue::from_static("1"));

        let reply = Reply::ok(&serde_json::json!({ "id": 1 }))
            .unwrap()
            .with_header(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=60"));

        let response = render(
            reply,
            guard_headers,
            formatters.default_formatter(),
            &Method::GET,
            true,
        )
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=60");
        assert_eq!(headers["x-guard"], "1");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::ETAG], etag::compute(b"{\"id\":1}"));
    }

    #[test]
    fn test_render_untagged_for_writes() {
        let formatters = FormatterRegistry::new(&[]);
        let reply = Reply::created(&serde_json::json!({ "id": 1 })).unwrap();
        let response = render(
            reply,
            HeaderMap::new(),
            formatters.default_formatter(),
            &Method::POST,
            true,
        )
        .unwrap();
        assert!(response.headers().get(header::ETAG).is_none());
    }

    #[test]
    fn test_render_marks_committed_reply() {
        let formatters = FormatterRegistry::new(&[]);
        let reply = Reply::created(&serde_json::json!({ "id": 1 }))
            .unwrap()
            .raising(ApiError::event("AuditFailed", "audit log unavailable"));
        let response = render(
            reply,
            HeaderMap::new(),
            formatters.default_formatter(),
            &Method::POST,
            false,
        )
        .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.extensions().get::<ResponseSent>().is_some());
        let raised = response.extensions().get::<RaisedError>().unwrap();
        assert_eq!(raised.0.event_name(), Some("AuditFailed"));
    }
}
