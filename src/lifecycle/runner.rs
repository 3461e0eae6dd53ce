//! Port resolution and the serve loop.

use axum::Router;
use std::net::{Ipv4Addr, SocketAddr};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{RuntimeEnv, ServerOptions};

use super::shutdown::{signalled, Shutdown};

/// Port used when neither the environment nor the options name one.
pub const DEFAULT_PORT: u16 = 3000;

/// Failures after assembly: binding the port or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Environment override, then options, then [`DEFAULT_PORT`].
pub fn resolve_port(env: &RuntimeEnv, options: &ServerOptions) -> u16 {
    env.port.or(options.port).unwrap_or(DEFAULT_PORT)
}

/// Bind every interface on `port`.
pub async fn bind(port: u16) -> Result<TcpListener, ServerError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serve on an already bound listener until `shutdown` fires.
pub async fn serve(
    name: &str,
    router: Router,
    listener: TcpListener,
    shutdown: &Shutdown,
) -> Result<(), ServerError> {
    let rx = shutdown.subscribe();
    axum::serve(listener, router)
        .with_graceful_shutdown(signalled(rx))
        .await?;
    tracing::info!(name = %name, "Server stopped");
    Ok(())
}

/// Bind `port`, report the outcome to `on_ready`, then serve.
///
/// Bind failures are not retried: the callback sees the error and it is
/// returned.
pub async fn run<F>(
    name: &str,
    router: Router,
    port: u16,
    shutdown: &Shutdown,
    on_ready: F,
) -> Result<(), ServerError>
where
    F: FnOnce(Result<u16, &ServerError>),
{
    let listener = match bind(port).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(name = %name, port, error = %e, "Failed to start server");
            on_ready(Err(&e));
            return Err(e);
        }
    };

    let bound = listener.local_addr()?.port();
    tracing::info!(name = %name, url = %format!("http://0.0.0.0:{}", bound), "Server listening");
    on_ready(Ok(bound));

    serve(name, router, listener, shutdown).await
}
