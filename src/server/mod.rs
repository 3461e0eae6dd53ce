//! Server factory.
//!
//! # Data Flow
//! ```text
//! RouteTable + ErrorHandlers + ServerOptions + RuntimeEnv
//!     → validate options
//!     → compile routes (routing::router)
//!     → build formatters and error mapper
//!     → plan stages and fold them around the routes (pipeline)
//!     → ApiServer (immutable) → listen / serve
//! ```

use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::{validate_options, RuntimeEnv, ServerOptions};
use crate::events::{ErrorHandlers, ErrorMapper};
use crate::format::FormatterRegistry;
use crate::lifecycle::{self, resolve_port, ServerError, Shutdown};
use crate::pipeline::{plan, Assembler, Stage};
use crate::routing::{builtin, build_router, compile, AssemblyError, Registration, RouteTable};

/// An assembled server, ready to listen.
#[derive(Debug, Clone)]
pub struct ApiServer {
    options: ServerOptions,
    port: u16,
    stages: Vec<Stage>,
    registrations: Vec<Registration>,
    mapper: Arc<ErrorMapper>,
    router: Router,
}

impl ApiServer {
    /// Consume the route and error handler tables into a server.
    pub fn assemble(
        routes: RouteTable,
        error_handlers: &ErrorHandlers,
        options: ServerOptions,
        env: &RuntimeEnv,
    ) -> Result<Self, AssemblyError> {
        validate_options(&options).map_err(AssemblyError::InvalidOptions)?;

        let reserved = builtin::reserved_paths(&options.swagger);
        let registrations = compile(routes, &reserved)?;

        let formatters = Arc::new(FormatterRegistry::new(&options.acceptable));
        let mapper = Arc::new(ErrorMapper::new(error_handlers));

        let stages = plan(&options, env);
        let routes = build_router(&registrations, formatters.clone(), &options.swagger);
        let router = Assembler::new(options.clone(), formatters, mapper.clone()).assemble(&stages, routes);

        tracing::info!(
            name = %options.app_name,
            routes = registrations.len(),
            custom_events = mapper.custom_events().count(),
            stages = %stages.iter().map(|s| s.name()).collect::<Vec<_>>().join(","),
            "Server assembled"
        );

        Ok(Self {
            port: resolve_port(env, &options),
            options,
            stages,
            registrations,
            mapper,
            router,
        })
    }

    pub fn name(&self) -> &str {
        &self.options.app_name
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Port `listen` binds.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn mapper(&self) -> &ErrorMapper {
        &self.mapper
    }

    /// The fully assembled service.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind the resolved port and serve; `on_ready` gets the bound port or
    /// the startup error.
    pub async fn listen<F>(self, shutdown: &Shutdown, on_ready: F) -> Result<(), ServerError>
    where
        F: FnOnce(Result<u16, &ServerError>),
    {
        lifecycle::run(&self.options.app_name, self.router, self.port, shutdown, on_ready).await
    }

    /// Serve on a listener the caller bound.
    pub async fn serve(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), ServerError> {
        lifecycle::serve(&self.options.app_name, self.router, listener, shutdown).await
    }
}
