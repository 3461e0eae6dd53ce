//! Shared utilities for integration tests.

#![allow(dead_code)]

use api_factory::{
    ApiError, ApiServer, Controller, ErrorHandlers, Middleware, Reply, RouteDescriptor, RouteTable,
    RuntimeEnv, ServerOptions, Shutdown,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

/// A server running on an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = self.handle.await;
    }
}

/// Assemble and serve on 127.0.0.1:0 in test mode.
pub async fn spawn_server(routes: RouteTable, handlers: ErrorHandlers, options: ServerOptions) -> TestServer {
    let server = ApiServer::assemble(routes, &handlers, options, &RuntimeEnv::test()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move {
        server.serve(listener, &server_shutdown).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        shutdown,
        handle,
    }
}

/// Client that neither follows redirects nor pools connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

pub fn json_controller(value: serde_json::Value) -> Controller {
    Controller::from_fn(move |_| {
        let value = value.clone();
        async move { Reply::ok(&value) }
    })
}

/// Controller counting its calls.
pub fn counting_controller(calls: Arc<AtomicUsize>) -> Controller {
    Controller::from_fn(move |_| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Reply::ok(&serde_json::json!({ "calls": "counted" }))
        }
    })
}

/// Table exercising the common behaviors.
pub fn sample_routes() -> RouteTable {
    RouteTable::new()
        .route(
            "get",
            RouteDescriptor::new("/items").controller(json_controller(serde_json::json!([
                { "id": 1, "name": "first item in the list" },
                { "id": 2, "name": "second item in the list" }
            ]))),
        )
        .route(
            "get",
            RouteDescriptor::new("/items/:id").controller(Controller::from_fn(|ctx| async move {
                Reply::ok(&serde_json::json!({ "id": ctx.param("id") }))
            })),
        )
        .route(
            "post",
            RouteDescriptor::new("/items")
                .auth(Middleware::require_authorization())
                .controller(Controller::from_fn(|ctx| async move {
                    let value: serde_json::Value = ctx.json()?;
                    Reply::created(&value)
                })),
        )
        .route(
            "get",
            RouteDescriptor::new("/cached")
                .cache(Middleware::cache_control("public, max-age=60").unwrap())
                .controller(json_controller(serde_json::json!({ "cached": true }))),
        )
        .route(
            "get",
            RouteDescriptor::new("/boom").controller(Controller::from_fn(|_| async {
                if std::env::var("NEVER_SET_IN_TESTS").is_err() {
                    panic!("controller exploded");
                }
                Reply::ok("unreachable")
            })),
        )
        .route(
            "get",
            RouteDescriptor::new("/teapot").controller(Controller::from_fn(|_| async {
                Err::<Reply, _>(ApiError::event("Teapot", "short and stout"))
            })),
        )
        .route(
            "get",
            RouteDescriptor::new("/missing").controller(Controller::from_fn(|_| async {
                Err::<Reply, _>(
                    ApiError::event("ItemMissing", "item 7 does not exist")
                        .with_user_message("That item could not be found"),
                )
            })),
        )
        .route(
            "get",
            RouteDescriptor::new("/committed").controller(Controller::from_fn(|_| async {
                Ok(Reply::no_content()
                    .with_status(axum::http::StatusCode::ACCEPTED)
                    .raising(ApiError::event("ItemMissing", "lookup failed after reply")))
            })),
        )
}

pub fn sample_handlers() -> ErrorHandlers {
    ErrorHandlers::new()
        .declare("ItemMissing", "NotFoundError")
        .declare("Teapot", "TeapotError")
}
