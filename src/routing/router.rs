//! Route registration engine.
//!
//! # Responsibilities
//! - Compile each descriptor once, defaulting the precondition
//! - Synthesize a HEAD registration for every GET
//! - Translate method aliases and `:param` paths to the router's syntax
//! - Reject duplicate, conflicting or reserved routes at assembly
//!
//! # Design Decisions
//! - A GET and its HEAD share one `Arc<CompiledRoute>`
//! - An explicit HEAD route replaces the synthesized one
//! - Unmatched methods on a known path raise MethodNotAllowed

use axum::{
    extract::{rejection::PathRejection, Path, Request},
    http::Method,
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter},
    Router,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::{SwaggerConfig, ValidationError};
use crate::errors::ApiError;
use crate::format::FormatterRegistry;
use crate::pipeline::sanitize::sanitize;

use super::builtin;
use super::descriptor::RouteTable;
use super::endpoint::{self, CompiledRoute};

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("{method} {path}: route has no controller")]
    MissingController { method: String, path: String },

    #[error("invalid route path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("unsupported method '{0}'")]
    UnknownMethod(String),

    #[error("{method} {path} is registered twice")]
    DuplicateRoute { method: Method, path: String },

    #[error("route path '{path}' conflicts with '{existing}'")]
    ConflictingPath { path: String, existing: String },

    #[error("route path '{0}' is reserved")]
    ReservedPath(String),

    #[error("invalid options: {}", join_errors(.0))]
    InvalidOptions(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Resolve a route table method name, including the `del` and `opts` aliases.
pub fn method_from_name(name: &str) -> Result<Method, AssemblyError> {
    let method = match name.to_ascii_lowercase().as_str() {
        "get" => Method::GET,
        "head" => Method::HEAD,
        "post" => Method::POST,
        "put" => Method::PUT,
        "patch" => Method::PATCH,
        "del" | "delete" => Method::DELETE,
        "opts" | "options" => Method::OPTIONS,
        "trace" => Method::TRACE,
        _ => return Err(AssemblyError::UnknownMethod(name.to_string())),
    };
    Ok(method)
}

/// Convert a route pattern to router syntax: `:id` becomes `{id}` and a
/// final `*rest` becomes `{*rest}`. Trailing and repeated slashes are
/// dropped, matching how request paths are sanitized.
///
/// Captures must span a whole segment, carry a name unique within the
/// pattern, and a wildcard may only close the pattern.
pub fn router_path(pattern: &str) -> Result<String, AssemblyError> {
    let invalid = |reason| AssemblyError::InvalidPath {
        path: pattern.to_string(),
        reason,
    };
    if !pattern.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }

    let sanitized = sanitize(pattern);
    let segments: Vec<&str> = sanitized.split('/').skip(1).collect();
    let last = segments.len().saturating_sub(1);

    let mut names: Vec<&str> = Vec::new();
    let mut path = String::with_capacity(sanitized.len() + 8);
    for (i, segment) in segments.iter().enumerate() {
        path.push('/');
        let capture = if let Some(name) = segment.strip_prefix(':') {
            Some((name, false))
        } else if let Some(name) = segment.strip_prefix('*') {
            Some((if name.is_empty() { "wildcard" } else { name }, true))
        } else if let Some(inner) = segment.strip_prefix('{') {
            let inner = inner
                .strip_suffix('}')
                .ok_or_else(|| invalid("unterminated '{' in segment"))?;
            match inner.strip_prefix('*') {
                Some(name) => Some((name, true)),
                None => Some((inner, false)),
            }
        } else if segment.contains(['{', '}']) {
            return Err(invalid("a capture must span the whole segment"));
        } else {
            None
        };

        let Some((name, catch_all)) = capture else {
            path.push_str(segment);
            continue;
        };
        if name.is_empty() {
            return Err(invalid("empty parameter name"));
        }
        if name.contains(['{', '}', ':', '*']) {
            return Err(invalid("invalid parameter name"));
        }
        if catch_all && i != last {
            return Err(invalid("wildcard must be the last segment"));
        }
        if names.contains(&name) {
            return Err(invalid("parameter name repeated"));
        }
        names.push(name);

        if catch_all {
            path.push_str(&format!("{{*{}}}", name));
        } else {
            path.push_str(&format!("{{{}}}", name));
        }
    }
    Ok(path)
}

/// Mirror of the router's matcher, fed every distinct path before the real
/// router is built so shape errors surface as [`AssemblyError`]s.
struct PathCheck {
    matcher: matchit::Router<()>,
    seen: HashSet<String>,
}

impl PathCheck {
    fn new(builtin: &[String]) -> Result<Self, AssemblyError> {
        let mut check = Self {
            matcher: matchit::Router::new(),
            seen: HashSet::new(),
        };
        for path in builtin {
            check.admit(path)?;
        }
        Ok(check)
    }

    fn admit(&mut self, path: &str) -> Result<(), AssemblyError> {
        if self.seen.contains(path) {
            return Ok(());
        }
        self.matcher.insert(path, ()).map_err(|e| {
            let reason = match e {
                matchit::InsertError::Conflict { with } => {
                    return AssemblyError::ConflictingPath {
                        path: path.to_string(),
                        existing: with,
                    }
                }
                matchit::InsertError::InvalidParamSegment => "only one capture per segment",
                matchit::InsertError::InvalidParam => "invalid parameter name",
                matchit::InsertError::InvalidCatchAll => "wildcard must be the last segment",
                _ => "rejected by the router",
            };
            AssemblyError::InvalidPath {
                path: path.to_string(),
                reason,
            }
        })?;
        self.seen.insert(path.to_string());
        Ok(())
    }
}

/// Path with capture names erased; equal shapes with different names
/// cannot coexist in the router.
fn shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}"
            } else if segment.starts_with('{') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// One (method, path) binding.
#[derive(Debug, Clone)]
pub struct Registration {
    pub method: Method,
    /// Path in router syntax.
    pub path: String,
    /// True for HEAD routes derived from a GET.
    pub synthesized: bool,
    pub route: Arc<CompiledRoute>,
    filter: MethodFilter,
}

impl Registration {
    fn new(method: Method, path: String, synthesized: bool, route: Arc<CompiledRoute>) -> Result<Self, AssemblyError> {
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| AssemblyError::UnknownMethod(method.to_string()))?;
        Ok(Self {
            method,
            path,
            synthesized,
            route,
            filter,
        })
    }

    /// Whether both registrations run the same compiled route.
    pub fn same_handler(&self, other: &Registration) -> bool {
        Arc::ptr_eq(&self.route, &other.route)
    }
}

fn insert(registrations: &mut Vec<Registration>, registration: Registration) -> Result<(), AssemblyError> {
    let new_shape = shape(&registration.path);
    if let Some(existing) = registrations
        .iter()
        .find(|r| r.path != registration.path && shape(&r.path) == new_shape)
    {
        return Err(AssemblyError::ConflictingPath {
            path: registration.path,
            existing: existing.path.clone(),
        });
    }

    let existing = registrations
        .iter()
        .position(|r| r.method == registration.method && r.path == registration.path);
    match existing {
        None => registrations.push(registration),
        Some(i) if registrations[i].synthesized && !registration.synthesized => {
            registrations[i] = registration;
        }
        Some(_) if registration.synthesized => {}
        Some(_) => {
            return Err(AssemblyError::DuplicateRoute {
                method: registration.method,
                path: registration.path,
            })
        }
    }
    Ok(())
}

/// Compile a route table into registrations, in table order.
pub fn compile(table: RouteTable, reserved: &[&str]) -> Result<Vec<Registration>, AssemblyError> {
    let mut registrations = Vec::with_capacity(table.len() * 2);
    let mut check = PathCheck::new(&builtin::mounted_patterns(reserved))?;

    for (name, descriptors) in table.into_methods() {
        let method = method_from_name(&name)?;
        for descriptor in descriptors {
            let pattern = descriptor.path().to_string();
            let path = router_path(&pattern)?;
            if builtin::is_reserved(&path, reserved) {
                return Err(AssemblyError::ReservedPath(pattern));
            }
            check.admit(&path)?;

            let route = CompiledRoute::compile(descriptor).ok_or_else(|| {
                AssemblyError::MissingController {
                    method: name.clone(),
                    path: pattern.clone(),
                }
            })?;
            let route = Arc::new(route);

            if method == Method::GET {
                insert(
                    &mut registrations,
                    Registration::new(Method::HEAD, path.clone(), true, route.clone())?,
                )?;
            }
            insert(&mut registrations, Registration::new(method.clone(), path, false, route)?)?;

            tracing::debug!(method = %method, path = %pattern, "Registered route");
        }
    }
    Ok(registrations)
}

async fn handle_request(
    route: Arc<CompiledRoute>,
    formatters: Arc<FormatterRegistry>,
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    req: Request,
) -> Response {
    let params = match params {
        Ok(Path(params)) => params,
        Err(PathRejection::MissingPathParams(_)) => HashMap::new(),
        Err(rejection) => return ApiError::bad_request(rejection.body_text()).into_response(),
    };
    endpoint::handle(route, formatters, req, params)
        .await
        .into_response()
}

/// Build the routing layer: caller routes plus built-in routes.
pub fn build_router(
    registrations: &[Registration],
    formatters: Arc<FormatterRegistry>,
    swagger: &SwaggerConfig,
) -> Router {
    let mut paths: Vec<&str> = Vec::new();
    for registration in registrations {
        if !paths.contains(&registration.path.as_str()) {
            paths.push(&registration.path);
        }
    }

    let mut router = Router::new();
    for path in paths {
        let method_router = registrations
            .iter()
            .filter(|r| r.path == path)
            .fold(MethodRouter::new(), |method_router, registration| {
                let route = registration.route.clone();
                let formatters = formatters.clone();
                method_router.on(
                    registration.filter,
                    move |params: Result<Path<HashMap<String, String>>, PathRejection>, req: Request| {
                        handle_request(route, formatters, params, req)
                    },
                )
            })
            .fallback(builtin::method_not_allowed);
        router = router.route(path, method_router);
    }

    builtin::mount(router, swagger)
}
