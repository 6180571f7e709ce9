//! Dotted paths over argument and result trees.
//!
//! A path such as `data.posts.create.0` walks object keys and, for numeric
//! segments, array positions. The empty path addresses the root.

use super::{NestedError, NestedResult};
use serde_json::{Map, Value};

pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}

pub fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|idx| items.get(idx)),
        _ => None,
    })
}

pub fn get_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    segments(path).try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |idx| items.get_mut(idx)),
        _ => None,
    })
}

/// Write `new_value` at `path`, creating missing intermediate containers.
///
/// A missing container becomes an array when the next segment is numeric and
/// an object otherwise. Walking into a scalar is a shape mismatch.
pub fn set(value: &mut Value, path: &str, new_value: Value) -> NestedResult<()> {
    let parts: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = parts.split_last() else {
        *value = new_value;
        return Ok(());
    };

    let mut current = value;
    for (pos, segment) in parents.iter().enumerate() {
        let next_is_index = parts[pos + 1].parse::<usize>().is_ok();
        current = child_slot(current, segment, path)?;
        if current.is_null() {
            *current = if next_is_index {
                Value::Array(Vec::new())
            } else {
                Value::Object(Map::new())
            };
        }
    }

    *child_slot(current, last, path)? = new_value;
    Ok(())
}

/// Remove and return the value at `path`.
pub fn remove(value: &mut Value, path: &str) -> Option<Value> {
    let parts: Vec<&str> = segments(path).collect();
    let (last, parents) = parts.split_last()?;
    let parent = get_mut(value, &parents.join("."))?;
    match parent {
        Value::Object(map) => map.remove(*last),
        Value::Array(items) => {
            let idx = last.parse::<usize>().ok()?;
            (idx < items.len()).then(|| items.remove(idx))
        }
        _ => None,
    }
}

fn child_slot<'a>(current: &'a mut Value, segment: &str, path: &str) -> NestedResult<&'a mut Value> {
    match current {
        Value::Object(map) => Ok(map.entry(segment.to_string()).or_insert(Value::Null)),
        Value::Array(items) => {
            let idx = segment.parse::<usize>().map_err(|_| {
                shape_mismatch(path, format!("'{}' is not an array index", segment))
            })?;
            if idx >= items.len() {
                items.resize(idx + 1, Value::Null);
            }
            Ok(&mut items[idx])
        }
        other => Err(shape_mismatch(
            path,
            format!("cannot descend into {} at '{}'", type_name(other), segment),
        )),
    }
}

fn shape_mismatch(path: &str, reason: String) -> NestedError {
    NestedError::middleware(anyhow::anyhow!("invalid argument path '{}': {}", path, reason))
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
