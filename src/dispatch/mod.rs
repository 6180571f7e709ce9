//! Nested dispatch coordinator.
//!
//! [`NestedMiddleware`] wraps one user middleware and applies it to an
//! operation, to every write nested in that operation's arguments and to
//! every relation in its `include` / `select` clauses, recursively.
//!
//! For a write with nested writes the flow is:
//!
//! 1. every nested write is dispatched as its own task, running the same
//!    coordinator with a child continuation;
//! 2. the parent waits until each nested middleware has called that
//!    continuation (or failed), then writes the operations they passed on back
//!    into its own arguments;
//! 3. the user middleware runs once on the parent with the real continuation;
//! 4. each nested continuation is released with its relation's slice of the
//!    result, and whatever the nested invocation returns replaces that slice.
//!
//! A failure anywhere rejects all pending nested continuations and is
//! returned to the caller unchanged.

mod pending;
mod shaping;
mod writeback;

use crate::catalog::{self, RelationCatalog};
use crate::core::{ActionKind, NestedError, NestedResult, Operation};
use crate::extract::extract_all_write_sites;
use crate::middleware::{Middleware, Next};
use async_recursion::async_recursion;
use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use pending::PendingInvocation;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

/// A middleware made nesting-aware; register it wherever the wrapped one
/// would have gone.
#[derive(Clone)]
pub struct NestedMiddleware {
    middleware: Arc<dyn Middleware>,
    catalog: RelationCatalog,
}

impl std::fmt::Debug for NestedMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestedMiddleware")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl NestedMiddleware {
    pub fn new(middleware: impl Middleware + 'static, catalog: RelationCatalog) -> Self {
        Self {
            middleware: Arc::new(middleware),
            catalog,
        }
    }

    pub fn catalog(&self) -> &RelationCatalog {
        &self.catalog
    }

    #[async_recursion]
    pub(crate) async fn handle_operation(&self, operation: Operation, next: Next) -> NestedResult<Value> {
        let span = info_span!(
            "nested_middleware",
            model = %operation.model,
            action = %operation.action,
            depth = operation.depth()
        );
        self.coordinate(operation, next).instrument(span).await
    }

    async fn coordinate(&self, mut operation: Operation, next: Next) -> NestedResult<Value> {
        shaping::apply(self, &mut operation).await?;

        let sites = match operation.action.kind() {
            ActionKind::WriteNestable => extract_all_write_sites(&operation, &self.catalog),
            ActionKind::WriteFlat
            | ActionKind::ShapingInclude
            | ActionKind::ShapingSelect
            | ActionKind::Read => Vec::new(),
        };

        if sites.is_empty() {
            return self.middleware.handle(operation, next).await;
        }

        debug!(sites = sites.len(), "dispatching nested writes");
        let mut pending: Vec<PendingInvocation> = sites
            .into_iter()
            .map(|site| PendingInvocation::dispatch(self, site))
            .collect();

        match self.apply(operation, next, &mut pending).await {
            Ok(result) => settle_success(&mut pending, result).await,
            Err(err) => settle_failure(&mut pending, err).await,
        }
    }

    /// Barrier, write-back, then the user middleware on the parent.
    async fn apply(
        &self,
        mut operation: Operation,
        next: Next,
        pending: &mut [PendingInvocation],
    ) -> NestedResult<Value> {
        let updates = try_join_all(pending.iter_mut().map(|invocation| invocation.ready())).await?;
        debug!("nested writes reached their continuations");

        let updates = pending
            .iter()
            .map(|invocation| invocation.locator.clone())
            .zip(updates)
            .collect();
        writeback::apply(&mut operation.args, updates)?;

        self.middleware.handle(operation, next).await
    }
}

#[async_trait]
impl Middleware for NestedMiddleware {
    async fn handle(&self, operation: Operation, next: Next) -> NestedResult<Value> {
        self.handle_operation(operation, next).await
    }
}

async fn settle_success(pending: &mut [PendingInvocation], mut result: Value) -> NestedResult<Value> {
    for invocation in pending.iter_mut() {
        let slice = result.get(invocation.relation.as_str()).cloned().unwrap_or(Value::Null);
        invocation.settle(Ok(slice));
    }

    let outcomes = join_all(pending.iter_mut().map(|invocation| invocation.outcome())).await;
    debug!(nested = outcomes.len(), "nested writes settled");

    for (invocation, outcome) in pending.iter().zip(outcomes) {
        let value = outcome?;
        if let Value::Object(fields) = &mut result {
            if !value.is_null() || fields.contains_key(&invocation.relation) {
                fields.insert(invocation.relation.clone(), value);
            }
        }
    }
    Ok(result)
}

async fn settle_failure(pending: &mut [PendingInvocation], err: NestedError) -> NestedResult<Value> {
    debug!(error = %err, "rejecting nested writes");
    for invocation in pending.iter_mut() {
        invocation.settle(Err(err.clone()));
    }

    // a nested invocation's own failure takes precedence over the parent's
    let outcomes = join_all(pending.iter_mut().map(|invocation| invocation.outcome())).await;
    match outcomes.into_iter().find_map(Result::err) {
        Some(nested) => Err(nested),
        None => Err(err),
    }
}

/// Wrap `middleware` using the process-wide relation catalog, initializing it
/// from the default schema metadata if [`crate::init`] was never called.
pub fn create_nested_middleware(middleware: impl Middleware + 'static) -> NestedResult<NestedMiddleware> {
    Ok(NestedMiddleware::new(middleware, catalog::global()?))
}
