use crate::catalog::{Dmmf, SchemaProvider};
use crate::core::{NestedResult, Operation};
use crate::middleware::{Middleware, Next};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// The engine at the end of the chain that actually performs an operation.
#[async_trait]
pub trait Downstream: Send + Sync {
    async fn execute(&self, operation: Operation) -> NestedResult<Value>;
}

pub struct FnDownstream<F> {
    f: F,
}

/// Turn `async |operation| ...` into a [`Downstream`].
pub fn downstream_fn<F, Fut>(f: F) -> FnDownstream<F>
where
    F: Fn(Operation) -> Fut + Send + Sync,
    Fut: Future<Output = NestedResult<Value>> + Send + 'static,
{
    FnDownstream { f }
}

#[async_trait]
impl<F, Fut> Downstream for FnDownstream<F>
where
    F: Fn(Operation) -> Fut + Send + Sync,
    Fut: Future<Output = NestedResult<Value>> + Send + 'static,
{
    async fn execute(&self, operation: Operation) -> NestedResult<Value> {
        (self.f)(operation).await
    }
}

/// Minimal data-access client: middleware in registration order in front of a
/// downstream engine.
///
/// The first registered middleware sees the operation first. A chain can carry
/// the schema metadata of its engine and be passed to [`crate::init`] as the
/// client handle.
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
    downstream: Arc<dyn Downstream>,
    dmmf: Option<Dmmf>,
}

impl MiddlewareChain {
    pub fn new(downstream: impl Downstream + 'static) -> Self {
        Self {
            middlewares: Vec::new(),
            downstream: Arc::new(downstream),
            dmmf: None,
        }
    }

    pub fn with_dmmf(mut self, dmmf: Dmmf) -> Self {
        self.dmmf = Some(dmmf);
        self
    }

    pub fn register(&mut self, middleware: impl Middleware + 'static) {
        self.middlewares.push(Arc::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub async fn execute(&self, operation: Operation) -> NestedResult<Value> {
        let stages: Arc<[Arc<dyn Middleware>]> = self.middlewares.clone().into();
        next_at(stages, Arc::clone(&self.downstream), 0)
            .run(operation)
            .await
    }
}

impl SchemaProvider for MiddlewareChain {
    fn dmmf(&self) -> Option<&Dmmf> {
        self.dmmf.as_ref()
    }
}

fn next_at(stages: Arc<[Arc<dyn Middleware>]>, downstream: Arc<dyn Downstream>, index: usize) -> Next {
    Next::new(move |operation: Operation| async move {
        match stages.get(index).cloned() {
            Some(stage) => {
                let next = next_at(Arc::clone(&stages), downstream, index + 1);
                stage.handle(operation, next).await
            }
            None => downstream.execute(operation).await,
        }
    })
}
