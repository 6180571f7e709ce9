use super::NestedMiddleware;
use crate::core::{path, Action, NestedResult, Operation};
use crate::middleware::Next;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tokio::sync::oneshot;
use tracing::trace;

/// Run the middleware over every relation named in the operation's
/// `include` and `select` clauses, rewriting each entry with what the
/// middleware passed on.
///
/// Branches run one after another. Their continuation resolves right away with
/// `null`: shaping clauses are consumed by the query, nothing flows back.
pub(super) async fn apply(coordinator: &NestedMiddleware, operation: &mut Operation) -> NestedResult<()> {
    let relations = coordinator.catalog().relations(&operation.model);
    if relations.is_empty() {
        return Ok(());
    }

    let mut settled: HashSet<(Action, &str)> = HashSet::new();
    for clause in [Action::Include, Action::Select] {
        for relation in relations {
            if settled.contains(&(clause, relation.name.as_str())) {
                continue;
            }

            let entry_path = path::join(clause.as_str(), &relation.name);
            let (args, from_flag) = match path::get(&operation.args, &entry_path) {
                Some(Value::Bool(true)) => (Value::Object(Map::new()), true),
                Some(entry @ Value::Object(_)) => (entry.clone(), false),
                _ => continue,
            };

            let branch = operation.child(&relation.target, clause, args);
            let Some(shaped) = run_branch(coordinator, branch).await? else {
                continue;
            };

            let target = if shaped.action.is_shaping() { shaped.action } else { clause };
            let value = match shaped.args {
                Value::Object(map) if map.is_empty() && from_flag => Value::Bool(true),
                other => other,
            };

            trace!(relation = %relation.name, clause = %target, "rewriting shaping clause");
            if target != clause {
                path::remove(&mut operation.args, &entry_path);
            }
            path::set(&mut operation.args, &path::join(target.as_str(), &relation.name), value)?;
            settled.insert((target, relation.name.as_str()));
        }
    }
    Ok(())
}

/// Returns the operation the branch handed to its continuation, if any.
async fn run_branch(coordinator: &NestedMiddleware, branch: Operation) -> NestedResult<Option<Operation>> {
    let (shaped_tx, shaped_rx) = oneshot::channel();
    let next = Next::new(move |shaped: Operation| async move {
        let _ = shaped_tx.send(shaped);
        Ok(Value::Null)
    });

    coordinator.handle_operation(branch, next).await?;
    Ok(shaped_rx.await.ok())
}
