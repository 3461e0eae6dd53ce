//! Path sanitization stage.

use axum::{
    extract::Request,
    http::{uri::PathAndQuery, Uri},
    middleware::Next,
    response::Response,
};

/// Collapse repeated slashes and drop a trailing slash (except for `/`).
pub fn sanitize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        out.push(c);
    }

    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// `uri` with its path replaced and its query kept.
pub(crate) fn rewrite(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse::<PathAndQuery>().ok()?);
    Uri::from_parts(parts).ok()
}

pub async fn sanitize_path(mut req: Request, next: Next) -> Response {
    let original = req.uri().path();
    let cleaned = sanitize(original);
    if cleaned != original {
        if let Some(uri) = rewrite(req.uri(), &cleaned) {
            tracing::trace!(from = %req.uri().path(), to = %cleaned, "Path sanitized");
            *req.uri_mut() = uri;
        }
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("/"), "/");
        assert_eq!(sanitize(""), "/");
        assert_eq!(sanitize("//"), "/");
        assert_eq!(sanitize("/items/"), "/items");
        assert_eq!(sanitize("//items///42//"), "/items/42");
        assert_eq!(sanitize("/items/42"), "/items/42");
    }

    #[test]
    fn test_rewrite_keeps_query() {
        let uri: Uri = "/items//?page=2&size=10".parse().unwrap();
        let rewritten = rewrite(&uri, &sanitize(uri.path())).unwrap();
        assert_eq!(rewritten.path(), "/items");
        assert_eq!(rewritten.query(), Some("page=2&size=10"));
    }
}
