//! Route-level middleware and controller handles.

use axum::http::{header, header::InvalidHeaderValue, HeaderValue};
use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;

use crate::errors::ApiError;

use super::context::{Reply, RequestContext};

type MiddlewareFn =
    dyn Fn(RequestContext) -> BoxFuture<'static, Result<RequestContext, ApiError>> + Send + Sync;

type ControllerFn = dyn Fn(RequestContext) -> BoxFuture<'static, Result<Reply, ApiError>> + Send + Sync;

/// A guard run before the controller: auth, cache or precondition.
///
/// It receives the request context and either hands it back (proceed) or
/// fails with an [`ApiError`] (short-circuit).
#[derive(Clone)]
pub struct Middleware {
    f: Arc<MiddlewareFn>,
}

impl Middleware {
    /// Wrap an async closure as a guard.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RequestContext, ApiError>> + Send + 'static,
    {
        Self {
            f: Arc::new(move |ctx| f(ctx).boxed()),
        }
    }

    /// Always succeeds; the default precondition.
    pub fn pass() -> Self {
        Self::from_fn(|ctx| async move { Ok(ctx) })
    }

    /// Sets `Cache-Control` on the eventual response.
    ///
    /// Fails if `value` is not a valid header value.
    pub fn cache_control(value: &str) -> Result<Self, InvalidHeaderValue> {
        let value = HeaderValue::from_str(value)?;
        Ok(Self::from_fn(move |mut ctx| {
            let value = value.clone();
            async move {
                ctx.set_response_header(header::CACHE_CONTROL, value);
                Ok(ctx)
            }
        }))
    }

    /// Rejects requests that did not send a parsable `Authorization` header.
    pub fn require_authorization() -> Self {
        Self::from_fn(|ctx| async move {
            if ctx.authorization().is_some() {
                Ok(ctx)
            } else {
                Err(ApiError::unauthorized("Authorization required"))
            }
        })
    }

    /// Run the guard against `ctx`.
    pub async fn run(&self, ctx: RequestContext) -> Result<RequestContext, ApiError> {
        (self.f)(ctx).await
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Middleware")
    }
}

/// Terminal handler producing the reply.
#[derive(Clone)]
pub struct Controller {
    f: Arc<ControllerFn>,
}

impl Controller {
    /// Wrap an async closure as a controller.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, ApiError>> + Send + 'static,
    {
        Self {
            f: Arc::new(move |ctx| f(ctx).boxed()),
        }
    }

    /// Produce the reply for `ctx`.
    pub async fn call(&self, ctx: RequestContext) -> Result<Reply, ApiError> {
        (self.f)(ctx).await
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Controller")
    }
}
