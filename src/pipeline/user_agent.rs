//! User-agent connection normalization.
//!
//! curl keeps connections open waiting for a body on HEAD responses that
//! announce a length. Such clients get `Connection: close`, and HEAD
//! responses lose their `Content-Length`.

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
};

fn is_curl(req: &Request) -> bool {
    req.headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| ua.to_ascii_lowercase().starts_with("curl"))
        .unwrap_or(false)
}

pub async fn user_agent_connection(req: Request, next: Next) -> Response {
    if !is_curl(&req) {
        return next.run(req).await;
    }

    let is_head = req.method() == Method::HEAD;
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
    if is_head {
        headers.remove(header::CONTENT_LENGTH);
    }
    response
}
