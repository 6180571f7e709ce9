// ============================================================================
// Nested Middleware Library
// ============================================================================

pub mod core;
pub mod catalog;
pub mod config;
pub mod extract;
pub mod middleware;
pub mod chain;
mod dispatch;

// Re-export main types for convenience
pub use crate::core::{Action, ActionKind, NestedError, NestedResult, Operation};
pub use catalog::{init, Dmmf, Relation, RelationCatalog, SchemaProvider};
pub use config::MiddlewareConfig;
pub use middleware::{middleware_fn, Middleware, Next};
pub use chain::{downstream_fn, Downstream, MiddlewareChain};
pub use dispatch::{create_nested_middleware, NestedMiddleware};

// ============================================================================
// High-level entry points
// ============================================================================

/// Wrap `middleware` so it also runs for every nested write and every
/// `include` / `select` relation, using an explicitly built catalog.
///
/// This is the recommended way to build a nesting-aware middleware; it does
/// not touch process-wide state.
///
/// # Examples
///
/// ```
/// use nested_middleware::{nested, middleware_fn, Dmmf, Next, Operation, RelationCatalog};
///
/// let catalog = RelationCatalog::from_dmmf(&Dmmf::default());
/// let logged = nested(
///     middleware_fn(|operation: Operation, next: Next| async move {
///         println!("{} {}", operation.model, operation.action);
///         next.run(operation).await
///     }),
///     catalog,
/// );
/// # let _ = logged;
/// ```
pub fn nested(middleware: impl Middleware + 'static, catalog: RelationCatalog) -> NestedMiddleware {
    NestedMiddleware::new(middleware, catalog)
}
