//! Demo API built with the server factory.
//!
//! Serves a small in-memory item store:
//!
//! ```text
//! GET    /ping           cached pong
//! POST   /echo           parsed request body (body parser must be enabled)
//! GET    /items          list, optional ?name= filter
//! GET    /items/:id      one item, or the ItemMissing event
//! POST   /items          create (authorization required), ItemExists on clash
//! DEL    /items/:id      delete (authorization required)
//! ```

use api_factory::config::{load_options, ServerOptions};
use api_factory::observability::{logging::init_logging, metrics::init_metrics};
use api_factory::{
    ApiError, ApiServer, Controller, ErrorHandlers, Middleware, Reply, RouteDescriptor,
    RouteTable, RuntimeEnv, Shutdown,
};
use axum::http::{header::InvalidHeaderValue, StatusCode};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Parser)]
#[command(name = "api-factory")]
#[command(about = "Demo API server assembled by the factory", long_about = None)]
struct Cli {
    /// Options file (TOML); defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
struct Item {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct NewItem {
    name: String,
}

#[derive(Default)]
struct Store {
    next_id: AtomicU64,
    items: RwLock<BTreeMap<u64, Item>>,
}

fn item_id(raw: Option<&str>) -> Result<u64, ApiError> {
    raw.and_then(|id| id.parse().ok())
        .ok_or_else(|| ApiError::bad_request("id must be a number").with_field("id"))
}

fn routes(store: Arc<Store>) -> Result<RouteTable, InvalidHeaderValue> {
    let ping_cache = Middleware::cache_control("public, max-age=60")?;

    let list = {
        let store = store.clone();
        Controller::from_fn(move |ctx| {
            let store = store.clone();
            async move {
                let filter = ctx.query_param("name").map(str::to_string);
                let items = store.items.read().await;
                let items: Vec<&Item> = items
                    .values()
                    .filter(|item| filter.as_deref().map_or(true, |name| item.name == name))
                    .collect();
                Reply::ok(&items)
            }
        })
    };

    let show = {
        let store = store.clone();
        Controller::from_fn(move |ctx| {
            let store = store.clone();
            async move {
                let id = item_id(ctx.param("id"))?;
                match store.items.read().await.get(&id) {
                    Some(item) => Reply::ok(item),
                    None => Err(ApiError::event("ItemMissing", format!("item {} does not exist", id))
                        .with_user_message("That item could not be found")),
                }
            }
        })
    };

    let unique_name = {
        let store = store.clone();
        Middleware::from_fn(move |ctx| {
            let store = store.clone();
            async move {
                let new: NewItem = ctx.json()?;
                if store.items.read().await.values().any(|item| item.name == new.name) {
                    return Err(ApiError::event("ItemExists", format!("item '{}' already exists", new.name))
                        .with_field("name"));
                }
                Ok(ctx)
            }
        })
    };

    let create = {
        let store = store.clone();
        Controller::from_fn(move |ctx| {
            let store = store.clone();
            async move {
                let new: NewItem = ctx.json()?;
                let id = store.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                let item = Item { id, name: new.name };
                store.items.write().await.insert(id, item.clone());
                tracing::info!(id, name = %item.name, "Item created");
                Reply::created(&item)?.with_location(&format!("/items/{}", id))
            }
        })
    };

    let remove = {
        let store = store.clone();
        Controller::from_fn(move |ctx| {
            let store = store.clone();
            async move {
                let id = item_id(ctx.param("id"))?;
                match store.items.write().await.remove(&id) {
                    Some(_) => Ok(Reply::no_content()),
                    None => Err(ApiError::event("ItemMissing", format!("item {} does not exist", id))),
                }
            }
        })
    };

    let table = RouteTable::new()
        .route(
            "get",
            RouteDescriptor::new("/ping")
                .cache(ping_cache)
                .controller(Controller::from_fn(|_| async {
                    Reply::ok(&serde_json::json!({ "pong": true }))
                })),
        )
        .route(
            "post",
            RouteDescriptor::new("/echo").controller(Controller::from_fn(|ctx| async move {
                let body = ctx
                    .parsed_body()
                    .ok_or_else(|| ApiError::bad_request("Body parsing is disabled"))?;
                match &body.value {
                    Some(value) => Reply::ok(value),
                    None => Ok(Reply::text(StatusCode::OK, String::from_utf8_lossy(&body.raw))),
                }
            })),
        )
        .route("get", RouteDescriptor::new("/items").controller(list))
        .route("get", RouteDescriptor::new("/items/:id").controller(show))
        .route(
            "post",
            RouteDescriptor::new("/items")
                .auth(Middleware::require_authorization())
                .precondition(unique_name)
                .controller(create),
        )
        .route(
            "del",
            RouteDescriptor::new("/items/:id")
                .auth(Middleware::require_authorization())
                .controller(remove),
        );
    Ok(table)
}

fn error_handlers() -> ErrorHandlers {
    ErrorHandlers::new()
        .declare("ItemMissing", "NotFoundError")
        .declare("ItemExists", "ConflictError")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let options = match &cli.config {
        Some(path) => load_options(path)?,
        None => {
            let mut options = ServerOptions::default();
            options.app_name = "api-factory-demo".to_string();
            options.body_parser.enabled = true;
            options
        }
    };
    init_logging(&options.logging);

    tracing::info!("api-factory v{} starting", env!("CARGO_PKG_VERSION"));

    if options.metrics.enabled {
        match options.metrics.address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %options.metrics.address,
                "Failed to parse metrics address"
            ),
        }
    }

    let env = RuntimeEnv::from_env()?;
    let server = ApiServer::assemble(routes(Arc::new(Store::default()))?, &error_handlers(), options, &env)?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    server
        .listen(&shutdown, |outcome| match outcome {
            Ok(port) => tracing::info!(port, "Ready"),
            Err(e) => tracing::error!(error = %e, "Startup failed"),
        })
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
