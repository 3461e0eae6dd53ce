//! Accept-header negotiation stage.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::errors::ApiError;
use crate::format::FormatterRegistry;

/// Restrict responses to the acceptable media types and record the choice.
pub async fn accept_negotiation(
    State(formatters): State<Arc<FormatterRegistry>>,
    mut req: Request,
    next: Next,
) -> Response {
    match formatters.negotiate(req.headers()) {
        Some(negotiated) => {
            req.extensions_mut().insert(negotiated);
            next.run(req).await
        }
        None => {
            let accept = req
                .headers()
                .get(header::ACCEPT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            tracing::debug!(accept = %accept, "No acceptable media type");
            ApiError::not_acceptable(format!("Server accepts: {}", formatters.acceptable().join(",")))
                .into_response()
        }
    }
}
