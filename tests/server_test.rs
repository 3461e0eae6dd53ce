//! End-to-end behavior of assembled servers.

use api_factory::routing::RouteOptions;
use api_factory::{Controller, ErrorHandlers, Middleware, Reply, RouteDescriptor, RouteTable, ServerOptions};
use reqwest::{header, StatusCode};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod common;

async fn sample_server() -> common::TestServer {
    let mut options = ServerOptions::default();
    options.body_parser.enabled = true;
    common::spawn_server(common::sample_routes(), common::sample_handlers(), options).await
}

#[tokio::test]
async fn test_health_with_empty_table() {
    let server = common::spawn_server(RouteTable::new(), ErrorHandlers::new(), ServerOptions::default()).await;
    let res = common::client().get(server.url("/_ah/health")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(res.text().await.unwrap(), "ok");
    server.stop().await;
}

#[tokio::test]
async fn test_not_found() {
    let server = sample_server().await;
    let res = common::client().get(server.url("/nope")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()[header::CACHE_CONTROL], "public, max-age=3600");
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json; charset=utf-8");
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "NotFound");
    assert_eq!(body["message"], "/nope does not exist");
    server.stop().await;
}

#[tokio::test]
async fn test_method_not_allowed() {
    let server = sample_server().await;
    let res = common::client().delete(server.url("/items")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()[header::CACHE_CONTROL], "public, max-age=3600");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "MethodNotAllowed");
    server.stop().await;
}

#[tokio::test]
async fn test_uncaught_panic() {
    let server = sample_server().await;
    let res = common::client().get(server.url("/boom")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.headers()[header::CACHE_CONTROL], "no-cache");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "controller exploded");
    server.stop().await;
}

#[tokio::test]
async fn test_custom_events() {
    let server = sample_server().await;
    let client = common::client();

    // Unrecognized class name renders as Internal.
    let res = client.get(server.url("/teapot")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.headers()[header::CACHE_CONTROL], "no-cache");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "Internal");
    assert_eq!(body["message"], "short and stout");

    let res = client.get(server.url("/missing")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["userMessage"], "That item could not be found");
    server.stop().await;
}

#[tokio::test]
async fn test_error_after_reply_keeps_reply() {
    let server = sample_server().await;
    let res = common::client().get(server.url("/committed")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::ACCEPTED);
    assert!(res.headers().get(header::CACHE_CONTROL).is_none());
    assert!(res.text().await.unwrap().is_empty());
    server.stop().await;
}

#[tokio::test]
async fn test_head_runs_get_route_without_body() {
    let calls = Arc::new(AtomicUsize::new(0));
    let routes = RouteTable::new().route(
        "get",
        RouteDescriptor::new("/count").controller(common::counting_controller(calls.clone())),
    );
    let server = common::spawn_server(routes, ErrorHandlers::new(), ServerOptions::default()).await;
    let client = common::client();

    let get = client.get(server.url("/count")).send().await.unwrap();
    let get_etag = get.headers()[header::ETAG].clone();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let head = client.head(server.url("/count")).send().await.unwrap();
    assert_eq!(head.status(), StatusCode::OK);
    assert_eq!(head.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(head.headers()[header::ETAG], get_etag);
    assert!(head.bytes().await.unwrap().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    server.stop().await;
}

#[tokio::test]
async fn test_guards_apply_to_head() {
    let routes = RouteTable::new().route(
        "get",
        RouteDescriptor::new("/secret")
            .auth(Middleware::require_authorization())
            .controller(common::json_controller(serde_json::json!({ "secret": 1 }))),
    );
    let server = common::spawn_server(routes, ErrorHandlers::new(), ServerOptions::default()).await;

    let res = common::client().head(server.url("/secret")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[header::CACHE_CONTROL], "no-cache");
    server.stop().await;
}

#[tokio::test]
async fn test_missing_precondition_behaves_as_pass() {
    let value = serde_json::json!({ "same": true });
    let routes = RouteTable::new()
        .route("get", RouteDescriptor::new("/implicit").controller(common::json_controller(value.clone())))
        .route(
            "get",
            RouteDescriptor::new("/explicit")
                .precondition(Middleware::pass())
                .controller(common::json_controller(value)),
        );
    let server = common::spawn_server(routes, ErrorHandlers::new(), ServerOptions::default()).await;
    let client = common::client();

    let implicit = client.get(server.url("/implicit")).send().await.unwrap();
    let explicit = client.get(server.url("/explicit")).send().await.unwrap();
    assert_eq!(implicit.status(), explicit.status());
    assert_eq!(implicit.headers()[header::ETAG], explicit.headers()[header::ETAG]);
    assert_eq!(implicit.text().await.unwrap(), explicit.text().await.unwrap());
    server.stop().await;
}

#[tokio::test]
async fn test_wildcard_accept_gets_json() {
    let server = sample_server().await;
    let client = common::client();

    for accept in ["*/*", "text/html, */*;q=0.1"] {
        let res = client
            .get(server.url("/items/7"))
            .header(header::ACCEPT, accept)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["id"], "7");
    }
    server.stop().await;
}

#[tokio::test]
async fn test_xml_and_unacceptable() {
    let server = sample_server().await;
    let client = common::client();

    let res = client
        .get(server.url("/items/7"))
        .header(header::ACCEPT, "application/xml")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/xml");
    assert!(res.text().await.unwrap().contains("<response>"));

    let res = client
        .get(server.url("/items"))
        .header(header::ACCEPT, "application/xml")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let text = res.text().await.unwrap();
    assert!(text.starts_with("<response><item><id>1</id>"));
    assert!(text.ends_with("</item></response>"));
    assert_eq!(text.matches("<response>").count(), 1);

    let res = client
        .get(server.url("/items/7"))
        .header(header::ACCEPT, "image/png")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_ACCEPTABLE);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json; charset=utf-8");
    server.stop().await;
}

#[tokio::test]
async fn test_authorization_and_body() {
    let server = sample_server().await;
    let client = common::client();
    let payload = serde_json::json!({ "name": "widget" });

    let res = client.post(server.url("/items")).json(&payload).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[header::CACHE_CONTROL], "no-cache");

    let res = client
        .post(server.url("/items"))
        .bearer_auth("token")
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.json::<Value>().await.unwrap(), payload);

    let res = client
        .post(server.url("/items"))
        .bearer_auth("token")
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    server.stop().await;
}

#[tokio::test]
async fn test_conditional_get() {
    let server = sample_server().await;
    let client = common::client();

    let res = client.get(server.url("/items")).send().await.unwrap();
    let etag = res.headers()[header::ETAG].clone();

    let res = client
        .get(server.url("/items"))
        .header(header::IF_NONE_MATCH, etag)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert!(res.bytes().await.unwrap().is_empty());

    let res = client
        .get(server.url("/items"))
        .header(header::IF_NONE_MATCH, "\"stale\"")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    server.stop().await;
}

#[tokio::test]
async fn test_route_cache_middleware() {
    let server = sample_server().await;
    let res = common::client().get(server.url("/cached")).send().await.unwrap();
    assert_eq!(res.headers()[header::CACHE_CONTROL], "public, max-age=60");
    server.stop().await;
}

#[tokio::test]
async fn test_cors_headers_on_success_and_error() {
    let server = sample_server().await;
    let client = common::client();

    for path in ["/items", "/nope"] {
        let res = client
            .get(server.url(path))
            .header(header::ORIGIN, "https://example.com")
            .send()
            .await
            .unwrap();
        assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
    server.stop().await;
}

#[tokio::test]
async fn test_compression_and_sanitized_paths() {
    let server = sample_server().await;
    let client = common::client();

    let res = client
        .get(server.url("/items/"))
        .header(header::ACCEPT_ENCODING, "gzip")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_ENCODING], "gzip");
    server.stop().await;
}

#[tokio::test]
async fn test_curl_connection_close() {
    let server = sample_server().await;
    let res = common::client()
        .get(server.url("/items"))
        .header(header::USER_AGENT, "curl/8.4.0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()[header::CONNECTION], "close");
    server.stop().await;
}

#[tokio::test]
async fn test_version_not_allowed() {
    let routes = RouteTable::new().route(
        "get",
        RouteDescriptor::new(RouteOptions::new("/versioned").version("1.0.0"))
            .controller(common::json_controller(serde_json::json!({ "v": 1 }))),
    );
    let server = common::spawn_server(routes, ErrorHandlers::new(), ServerOptions::default()).await;
    let client = common::client();

    let res = client
        .get(server.url("/versioned"))
        .header("accept-version", "1.0.0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(server.url("/versioned"))
        .header("accept-version", "2.0.0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.headers()[header::CACHE_CONTROL], "public, max-age=60");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "InvalidVersion");
    server.stop().await;
}

#[tokio::test]
async fn test_query_parameters() {
    let routes = RouteTable::new().route(
        "get",
        RouteDescriptor::new("/search").controller(Controller::from_fn(|ctx| async move {
            Reply::ok(&serde_json::json!({ "q": ctx.query_param("q") }))
        })),
    );
    let server = common::spawn_server(routes, ErrorHandlers::new(), ServerOptions::default()).await;

    let res = common::client()
        .get(server.url("/search?q=red%20shoes"))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["q"], "red shoes");
    server.stop().await;
}

async fn docs_server(ui: &std::path::Path, docs: &std::path::Path) -> common::TestServer {
    let mut options = ServerOptions::default();
    options.swagger.enabled = true;
    options.swagger.ui_dir = ui.to_path_buf();
    options.swagger.api_docs_dir = Some(docs.to_path_buf());
    common::spawn_server(RouteTable::new(), ErrorHandlers::new(), options).await
}

#[tokio::test]
async fn test_swagger_ui_directories() {
    let ui = tempfile::tempdir().unwrap();
    let docs = tempfile::tempdir().unwrap();
    std::fs::write(ui.path().join("index.html"), "<html>root</html>").unwrap();
    std::fs::create_dir(ui.path().join("sub")).unwrap();
    std::fs::write(ui.path().join("sub").join("index.html"), "<html>sub</html>").unwrap();
    let server = docs_server(ui.path(), docs.path()).await;

    for (path, body) in [("/swagger", "root"), ("/swagger/", "root"), ("/swagger/sub/", "sub"), ("/swagger/sub", "sub")] {
        let res = common::client().get(server.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{}", path);
        assert!(res.headers().get(header::LOCATION).is_none(), "{}", path);
        assert!(res.text().await.unwrap().contains(body), "{}", path);
    }

    let res = common::client().get(server.url("/swagger/missing.js")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "/swagger/missing.js does not exist");
    server.stop().await;
}

#[tokio::test]
async fn test_api_docs_default_document() {
    let ui = tempfile::tempdir().unwrap();
    let docs = tempfile::tempdir().unwrap();
    std::fs::write(docs.path().join("swagger.json"), r#"{"openapi":"3"}"#).unwrap();
    std::fs::write(docs.path().join("v2.json"), r#"{"swagger":"2"}"#).unwrap();
    let server = docs_server(ui.path(), docs.path()).await;

    for path in ["/api-docs", "/api-docs/"] {
        let res = common::client().get(server.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{}", path);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["openapi"], "3");
    }

    let res = common::client().get(server.url("/api-docs/v2.json")).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["swagger"], "2");

    let res = common::client().get(server.url("/api-docs/nope.json")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "NotFound");
    server.stop().await;
}
