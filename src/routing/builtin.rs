//! Routes every assembled server carries regardless of its route table.

use axum::{
    extract::{OriginalUri, Request, State},
    handler::HandlerWithoutStateExt,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::config::SwaggerConfig;
use crate::errors::ApiError;
use crate::pipeline::sanitize::rewrite;

pub const HEALTH_PATH: &str = "/_ah/health";
pub const SWAGGER_PATH: &str = "/swagger";
pub const API_DOCS_PATH: &str = "/api-docs";

/// Served when an api-docs directory request names no file.
pub const API_DOCS_DEFAULT: &str = "swagger.json";

/// Default document of every swagger UI directory.
pub const SWAGGER_UI_DEFAULT: &str = "index.html";

/// Paths the caller's table may not claim.
pub fn reserved_paths(swagger: &SwaggerConfig) -> Vec<&'static str> {
    let mut paths = vec![HEALTH_PATH];
    if swagger.enabled {
        paths.push(SWAGGER_PATH);
        if swagger.api_docs_dir.is_some() {
            paths.push(API_DOCS_PATH);
        }
    }
    paths
}

/// Whether `path` is, or lies under, one of `reserved`.
pub fn is_reserved(path: &str, reserved: &[&str]) -> bool {
    reserved.iter().any(|r| {
        path == *r
            || path
                .strip_prefix(r)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Router patterns the built-in routes occupy for the given reserved paths.
///
/// Static mounts claim their prefix and everything below it.
pub fn mounted_patterns(reserved: &[&str]) -> Vec<String> {
    let mut patterns = Vec::with_capacity(reserved.len() * 2);
    for path in reserved {
        patterns.push(path.to_string());
        if *path == SWAGGER_PATH || *path == API_DOCS_PATH {
            patterns.push(format!("{}/{{*rest}}", path));
        }
    }
    patterns
}

pub async fn health() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))], "ok")
}

pub async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::not_found(format!("{} does not exist", uri.path()))
}

pub async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::method_not_allowed(format!("{} is not allowed on {}", method, uri.path()))
}

/// A directory served under a fixed prefix.
#[derive(Debug)]
struct StaticMount {
    dir: PathBuf,
    /// Document answering a directory request.
    default_doc: &'static str,
    /// Whether subdirectories get their default document too, or only the root.
    nested: bool,
}

impl StaticMount {
    async fn is_dir(&self, path: &str) -> bool {
        let relative = path.trim_start_matches('/');
        if relative
            .split('/')
            .any(|segment| segment == ".." || segment.contains(['%', '\\']))
        {
            return false;
        }
        tokio::fs::metadata(self.dir.join(relative))
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    /// Request path of the default document when `path` names a directory.
    async fn default_for(&self, path: &str) -> Option<String> {
        let directory = path == "/" || (self.nested && self.is_dir(path).await);
        directory.then(|| format!("{}/{}", path.trim_end_matches('/'), self.default_doc))
    }

    fn into_router(self) -> Router {
        let files = ServeDir::new(&self.dir)
            .append_index_html_on_directories(false)
            .not_found_service(not_found.into_service());
        Router::new()
            .fallback_service(files)
            .layer(middleware::from_fn_with_state(Arc::new(self), default_document))
    }
}

/// Point directory requests at the mount's default document.
///
/// Request paths arrive without a trailing slash, so the file server's own
/// index handling would redirect outside the mount prefix.
async fn default_document(State(mount): State<Arc<StaticMount>>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if let Some(target) = mount.default_for(&path).await {
        if let Some(uri) = rewrite(req.uri(), &target) {
            *req.uri_mut() = uri;
        }
    }
    next.run(req).await
}

fn static_mount(dir: &Path, default_doc: &'static str, nested: bool) -> Router {
    StaticMount {
        dir: dir.to_path_buf(),
        default_doc,
        nested,
    }
    .into_router()
}

/// Add health, documentation and the not-found fallback to `router`.
pub fn mount(mut router: Router, swagger: &SwaggerConfig) -> Router {
    router = router.route(HEALTH_PATH, get(health).fallback(method_not_allowed));

    if swagger.enabled {
        router = router.nest_service(SWAGGER_PATH, static_mount(&swagger.ui_dir, SWAGGER_UI_DEFAULT, true));
        tracing::debug!(dir = %swagger.ui_dir.display(), "Serving swagger UI at {}", SWAGGER_PATH);

        if let Some(dir) = &swagger.api_docs_dir {
            router = router.nest_service(API_DOCS_PATH, static_mount(dir, API_DOCS_DEFAULT, false));
            tracing::debug!(dir = %dir.display(), "Serving API docs at {}", API_DOCS_PATH);
        }
    }

    router.fallback(not_found)
}
