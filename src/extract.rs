//! Discovery of nested write clauses inside an operation's arguments.

use crate::catalog::{Relation, RelationCatalog};
use crate::core::{path, Action, Operation};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Where a nested write clause lives in its parent's arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteLocator {
    /// Path probed for write keys, e.g. `data.posts`
    pub prefix: String,
    /// Write key found under `prefix`
    pub action: Action,
    /// Element position when the clause holds a list
    pub index: Option<usize>,
}

impl SiteLocator {
    pub fn path(&self) -> String {
        let path = path::join(&self.prefix, self.action.as_str());
        match self.index {
            Some(index) => path::join(&path, &index.to_string()),
            None => path,
        }
    }
}

impl fmt::Display for SiteLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// A nested write clause and the operation synthesized for it.
#[derive(Debug, Clone)]
pub struct WriteSite {
    pub locator: SiteLocator,
    /// Relation field the clause belongs to
    pub relation: String,
    pub operation: Operation,
}

/// Write clauses stored under `prefix` for one relation.
///
/// Every recognised write key yields a site; a list value yields one site per
/// element.
pub fn extract_write_sites(operation: &Operation, relation: &Relation, prefix: &str) -> Vec<WriteSite> {
    let Some(Value::Object(clause)) = path::get(&operation.args, prefix) else {
        return Vec::new();
    };

    let scope = Arc::new(operation.clone());
    let mut sites = Vec::new();
    for action in Action::WRITES {
        let Some(value) = clause.get(action.as_str()) else {
            continue;
        };

        let site = |index: Option<usize>, args: &Value| WriteSite {
            locator: SiteLocator {
                prefix: prefix.to_string(),
                action,
                index,
            },
            relation: relation.name.clone(),
            operation: Operation::nested_in(&scope, &relation.target, action, args.clone()),
        };

        match value {
            Value::Array(items) => {
                sites.extend(items.iter().enumerate().map(|(i, item)| site(Some(i), item)))
            }
            single => sites.push(site(None, single)),
        }
    }
    sites
}

/// Write clauses for one relation, probing the paths the parent action
/// places nested data under.
pub fn extract_nested_write_sites(operation: &Operation, relation: &Relation) -> Vec<WriteSite> {
    let field = relation.name.as_str();
    match operation.action {
        Action::Upsert => {
            let mut sites = extract_write_sites(operation, relation, &path::join("update", field));
            sites.extend(extract_write_sites(operation, relation, &path::join("create", field)));
            sites
        }
        // a create nested in another write carries its data without a `data` wrapper
        Action::Create if operation.is_nested() => extract_write_sites(operation, relation, field),
        Action::Create | Action::Update | Action::UpdateMany | Action::CreateMany => {
            extract_write_sites(operation, relation, &path::join("data", field))
        }
        Action::ConnectOrCreate => {
            extract_write_sites(operation, relation, &path::join("create", field))
        }
        _ => Vec::new(),
    }
}

/// All nested write sites of an operation, relation by relation in catalog
/// order. Only actions that support nested writes have any.
pub fn extract_all_write_sites(operation: &Operation, catalog: &RelationCatalog) -> Vec<WriteSite> {
    if !operation.action.supports_nested_writes() {
        return Vec::new();
    }

    catalog
        .relations(&operation.model)
        .iter()
        .flat_map(|relation| extract_nested_write_sites(operation, relation))
        .collect()
}
