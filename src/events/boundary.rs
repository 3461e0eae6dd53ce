//! Error boundary stage and panic capture.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::{ApiError, RaisedError, ResponseSent};
use crate::format::FormatterRegistry;
use crate::observability::metrics;

use super::mapper::ErrorMapper;

/// State shared by the error boundary.
#[derive(Debug, Clone)]
pub struct ErrorBoundary {
    pub mapper: Arc<ErrorMapper>,
    pub formatters: Arc<FormatterRegistry>,
}

/// Render raised errors exactly once, with the negotiated formatter.
pub async fn error_boundary(
    State(boundary): State<ErrorBoundary>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let negotiated = boundary.formatters.negotiate_or_default(req.headers());

    let mut response = next.run(req).await;

    if let Some(RaisedError(err)) = response.extensions_mut().remove::<RaisedError>() {
        if response.extensions().get::<ResponseSent>().is_some() {
            let resolution = boundary.mapper.report(&err);
            tracing::debug!(
                event = %resolution.event.name(),
                status = %response.status(),
                "Response already sent; error not rendered"
            );
        } else {
            let formatter = boundary.formatters.formatter_for(&negotiated);
            let (parts, _) = response.into_parts();
            response = boundary.mapper.respond(&err, formatter, parts);
        }
    }

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

/// Turn a caught panic into the uncaught-exception event.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };
    ApiError::uncaught(message).into_response()
}
