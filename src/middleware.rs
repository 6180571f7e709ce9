use crate::core::{NestedResult, Operation};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type NextFn = Box<dyn FnOnce(Operation) -> BoxFuture<'static, NestedResult<Value>> + Send>;

/// Continuation handed to a middleware.
///
/// Calling [`Next::run`] passes the (possibly replaced) operation to the next
/// stage and resolves with whatever that stage eventually produces. It can be
/// called at most once.
pub struct Next {
    inner: NextFn,
}

impl Next {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Operation) -> Fut + Send + 'static,
        Fut: Future<Output = NestedResult<Value>> + Send + 'static,
    {
        Self {
            inner: Box::new(move |operation| Box::pin(f(operation))),
        }
    }

    pub async fn run(self, operation: Operation) -> NestedResult<Value> {
        (self.inner)(operation).await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Next")
    }
}

/// A stage of the data-access middleware chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, operation: Operation, next: Next) -> NestedResult<Value>;
}

#[async_trait]
impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    async fn handle(&self, operation: Operation, next: Next) -> NestedResult<Value> {
        (**self).handle(operation, next).await
    }
}

/// Middleware backed by a closure; see [`middleware_fn`].
#[derive(Clone)]
pub struct FnMiddleware<F> {
    f: F,
}

/// Turn `async |operation, next| ...` into a [`Middleware`].
///
/// ```
/// use nested_middleware::{middleware_fn, Next, Operation};
///
/// let passthrough = middleware_fn(|operation: Operation, next: Next| next.run(operation));
/// # let _ = passthrough;
/// ```
pub fn middleware_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(Operation, Next) -> Fut + Send + Sync,
    Fut: Future<Output = NestedResult<Value>> + Send + 'static,
{
    FnMiddleware { f }
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Operation, Next) -> Fut + Send + Sync,
    Fut: Future<Output = NestedResult<Value>> + Send + 'static,
{
    async fn handle(&self, operation: Operation, next: Next) -> NestedResult<Value> {
        (self.f)(operation, next).await
    }
}
