//! Folds the stage plan around the routing layer.

use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, compression::CompressionLayer};

use crate::config::ServerOptions;
use crate::events::{error_boundary, panic_response, ErrorBoundary, ErrorMapper};
use crate::format::FormatterRegistry;
use crate::observability::tracing::{with_access_log, with_request_id};

use super::accept::accept_negotiation;
use super::authorization::parse_authorization;
use super::body::parse_body;
use super::conditional::conditional_request;
use super::cors::cors_layer;
use super::etag::etag;
use super::plan::Stage;
use super::query::parse_query;
use super::sanitize::sanitize_path;
use super::user_agent::user_agent_connection;

/// Shared state the stages are built from.
#[derive(Debug, Clone)]
pub struct Assembler {
    options: ServerOptions,
    formatters: Arc<FormatterRegistry>,
    mapper: Arc<ErrorMapper>,
}

impl Assembler {
    pub fn new(options: ServerOptions, formatters: Arc<FormatterRegistry>, mapper: Arc<ErrorMapper>) -> Self {
        Self {
            options,
            formatters,
            mapper,
        }
    }

    /// Wrap `routes` in `stages`, the first stage outermost.
    pub fn assemble(&self, stages: &[Stage], routes: Router) -> Router {
        stages
            .iter()
            .rev()
            .fold(routes, |inner, stage| self.wrap(*stage, inner))
    }

    /// Run `stage` in front of `inner`.
    ///
    /// The inner router is mounted as a fallback so the stage sees the
    /// request before the inner router matches it; a rewritten path is what
    /// gets routed.
    pub fn wrap(&self, stage: Stage, inner: Router) -> Router {
        let outer = Router::new().fallback_service(inner);
        match stage {
            Stage::RequestId => with_request_id(outer),
            Stage::AccessLog => with_access_log(outer),
            Stage::ErrorBoundary => outer.layer(middleware::from_fn_with_state(
                ErrorBoundary {
                    mapper: self.mapper.clone(),
                    formatters: self.formatters.clone(),
                },
                error_boundary,
            )),
            Stage::PanicCapture => outer.layer(CatchPanicLayer::custom(panic_response)),
            Stage::AcceptNegotiation => outer.layer(middleware::from_fn_with_state(
                self.formatters.clone(),
                accept_negotiation,
            )),
            Stage::UserAgentConnection => outer.layer(middleware::from_fn(user_agent_connection)),
            Stage::SanitizePath => outer.layer(middleware::from_fn(sanitize_path)),
            Stage::Cors => outer.layer(cors_layer(&self.options.cors)),
            Stage::Authorization => outer.layer(middleware::from_fn_with_state(
                Arc::new(self.options.authorization.clone()),
                parse_authorization,
            )),
            Stage::BodyParser => outer.layer(middleware::from_fn_with_state(
                Arc::new(self.options.body_parser.clone()),
                parse_body,
            )),
            Stage::QueryParser => outer.layer(middleware::from_fn(parse_query)),
            Stage::Compression => outer.layer(CompressionLayer::new()),
            Stage::Etag => outer.layer(middleware::from_fn(etag)),
            Stage::ConditionalRequest => outer.layer(middleware::from_fn(conditional_request)),
        }
    }
}
