use crate::core::{path, Action, NestedError, NestedResult, Operation};
use crate::extract::SiteLocator;
use serde_json::{Map, Value};
use tracing::trace;

/// Merge the operations nested middleware passed to their continuations back
/// into the parent's arguments.
///
/// An operation that kept its action replaces the clause (or list element) it
/// came from. One that switched action is removed from its old key and
/// appended under the new one.
pub(super) fn apply(args: &mut Value, updates: Vec<(SiteLocator, Option<Operation>)>) -> NestedResult<()> {
    let mut groups: Vec<(String, Vec<(SiteLocator, Operation)>)> = Vec::new();
    for (locator, update) in updates {
        let Some(operation) = update else {
            continue;
        };
        match groups.iter_mut().find(|(prefix, _)| *prefix == locator.prefix) {
            Some((_, entries)) => entries.push((locator, operation)),
            None => groups.push((locator.prefix.clone(), vec![(locator, operation)])),
        }
    }

    for (prefix, entries) in groups {
        let Some(Value::Object(clause)) = path::get_mut(args, &prefix) else {
            return Err(NestedError::middleware(anyhow::anyhow!(
                "nested write clause at '{}' is no longer an object",
                prefix
            )));
        };
        apply_clause(clause, entries)?;
    }
    Ok(())
}

fn apply_clause(clause: &mut Map<String, Value>, entries: Vec<(SiteLocator, Operation)>) -> NestedResult<()> {
    let mut removed: Vec<(Action, Option<usize>)> = Vec::new();
    let mut moved: Vec<(Action, Value, bool)> = Vec::new();

    for (locator, operation) in entries {
        trace!(path = %locator, action = %operation.action, "writing back nested arguments");
        if operation.action != locator.action {
            removed.push((locator.action, locator.index));
            moved.push((operation.action, operation.args, locator.index.is_some()));
            continue;
        }

        match (clause.get_mut(locator.action.as_str()), locator.index) {
            (Some(Value::Array(items)), Some(index)) if index < items.len() => {
                items[index] = operation.args
            }
            (Some(slot), None) => *slot = operation.args,
            _ => {
                return Err(NestedError::middleware(anyhow::anyhow!(
                    "nested write at '{}' no longer exists",
                    locator
                )));
            }
        }
    }

    // highest positions first so earlier ones stay valid
    removed.sort_by(|a, b| b.1.cmp(&a.1));
    for (action, index) in removed {
        let key = action.as_str();
        let emptied = match index {
            None => true,
            Some(index) => match clause.get_mut(key) {
                Some(Value::Array(items)) => {
                    if index < items.len() {
                        items.remove(index);
                    }
                    items.is_empty()
                }
                _ => false,
            },
        };
        if emptied {
            clause.remove(key);
        }
    }

    for (action, value, from_list) in moved {
        let key = action.as_str();
        match clause.get_mut(key) {
            None => {
                let value = if from_list { Value::Array(vec![value]) } else { value };
                clause.insert(key.to_string(), value);
            }
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
        }
    }
    Ok(())
}
