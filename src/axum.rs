//! Axum integration utilities.

use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::engine::Engine;
use crate::types::{ResourceId, Subject, UserId};

use ::axum::body::Body;
use ::axum::http::{Request, StatusCode};
use ::axum::response::{IntoResponse, Response};
use ::tower::{Layer, Service};
use tracing::warn;

/// Authenticated user attached to a request's extensions by upstream
/// authentication middleware.
#[derive(Debug, Clone)]
pub struct UserContext {
    /// User identifier.
    pub user: UserId,
}

impl UserContext {
    /// Creates a context for `user`.
    pub fn new(user: UserId) -> Self {
        Self { user }
    }
}

/// Middleware layer that requires the request's user to be allowed a resource.
#[derive(Debug)]
pub struct RequireResource<S> {
    engine: Arc<Engine<S>>,
    resource: ResourceId,
}

impl<S> RequireResource<S> {
    /// Creates a new guard layer for `resource`.
    pub fn new(engine: Arc<Engine<S>>, resource: ResourceId) -> Self {
        Self { engine, resource }
    }
}

impl<S> Clone for RequireResource<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            resource: self.resource.clone(),
        }
    }
}

impl<S, Inner> Layer<Inner> for RequireResource<S>
where
    S: crate::store::Store,
{
    type Service = RequireResourceService<Inner, S>;

    fn layer(&self, inner: Inner) -> Self::Service {
        RequireResourceService {
            inner,
            engine: self.engine.clone(),
            resource: self.resource.clone(),
        }
    }
}

/// Middleware service that enforces [`RequireResource`].
///
/// Responds `401` without a [`UserContext`], `403` when the user is not
/// allowed and `500` when the store fails while loading the user's roles.
#[derive(Debug)]
pub struct RequireResourceService<Inner, S> {
    inner: Inner,
    engine: Arc<Engine<S>>,
    resource: ResourceId,
}

impl<Inner: Clone, S> Clone for RequireResourceService<Inner, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            engine: self.engine.clone(),
            resource: self.resource.clone(),
        }
    }
}

impl<Inner, S> Service<Request<Body>> for RequireResourceService<Inner, S>
where
    Inner: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    Inner::Future: Send + 'static,
    S: crate::store::Store + 'static,
{
    type Response = Response;
    type Error = Inner::Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let engine = self.engine.clone();
        let resource = self.resource.clone();

        Box::pin(async move {
            let context = req.extensions().get::<UserContext>().cloned();
            let Some(context) = context else {
                return Ok((StatusCode::UNAUTHORIZED, "missing user context").into_response());
            };

            match engine
                .is_allow(Subject::User(context.user.clone()), &resource)
                .await
            {
                Ok(true) => {
                    poll_fn(|cx| inner.poll_ready(cx)).await?;
                    inner.call(req).await
                }
                Ok(false) => Ok((StatusCode::FORBIDDEN, "forbidden").into_response()),
                Err(err) => {
                    warn!(user = %context.user, resource = %resource, error = %err, "authorization failed");
                    Ok((StatusCode::INTERNAL_SERVER_ERROR, "authorization error").into_response())
                }
            }
        })
    }
}
