use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Closed set of actions an operation can carry.
///
/// Besides the actions a client issues at the top level, `connectOrCreate`
/// only ever appears nested, and `include` / `select` are synthesized for
/// shaping clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    FindUnique,
    FindUniqueOrThrow,
    FindFirst,
    FindFirstOrThrow,
    FindMany,
    Aggregate,
    Count,
    GroupBy,
    QueryRaw,
    ExecuteRaw,
    RunCommandRaw,
    FindRaw,
    AggregateRaw,
    Create,
    CreateMany,
    Update,
    UpdateMany,
    Upsert,
    Delete,
    DeleteMany,
    ConnectOrCreate,
    Include,
    Select,
}

/// How the coordinator treats an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Writes whose arguments may carry nested writes.
    WriteNestable,
    /// Writes that never carry nested writes.
    WriteFlat,
    ShapingInclude,
    ShapingSelect,
    Read,
}

impl Action {
    pub const WRITES: [Action; 8] = [
        Action::Create,
        Action::Update,
        Action::Upsert,
        Action::ConnectOrCreate,
        Action::CreateMany,
        Action::UpdateMany,
        Action::Delete,
        Action::DeleteMany,
    ];

    pub fn kind(self) -> ActionKind {
        match self {
            Action::Create | Action::Update | Action::Upsert | Action::ConnectOrCreate => {
                ActionKind::WriteNestable
            }
            Action::CreateMany | Action::UpdateMany | Action::Delete | Action::DeleteMany => {
                ActionKind::WriteFlat
            }
            Action::Include => ActionKind::ShapingInclude,
            Action::Select => ActionKind::ShapingSelect,
            _ => ActionKind::Read,
        }
    }

    pub fn is_write(self) -> bool {
        matches!(self.kind(), ActionKind::WriteNestable | ActionKind::WriteFlat)
    }

    pub fn supports_nested_writes(self) -> bool {
        self.kind() == ActionKind::WriteNestable
    }

    pub fn is_shaping(self) -> bool {
        matches!(self.kind(), ActionKind::ShapingInclude | ActionKind::ShapingSelect)
    }

    /// Key under which the action appears inside an argument tree.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::FindUnique => "findUnique",
            Action::FindUniqueOrThrow => "findUniqueOrThrow",
            Action::FindFirst => "findFirst",
            Action::FindFirstOrThrow => "findFirstOrThrow",
            Action::FindMany => "findMany",
            Action::Aggregate => "aggregate",
            Action::Count => "count",
            Action::GroupBy => "groupBy",
            Action::QueryRaw => "queryRaw",
            Action::ExecuteRaw => "executeRaw",
            Action::RunCommandRaw => "runCommandRaw",
            Action::FindRaw => "findRaw",
            Action::AggregateRaw => "aggregateRaw",
            Action::Create => "create",
            Action::CreateMany => "createMany",
            Action::Update => "update",
            Action::UpdateMany => "updateMany",
            Action::Upsert => "upsert",
            Action::Delete => "delete",
            Action::DeleteMany => "deleteMany",
            Action::ConnectOrCreate => "connectOrCreate",
            Action::Include => "include",
            Action::Select => "select",
        }
    }

    /// Recognise a write action key found in an argument tree.
    pub fn write_from_key(key: &str) -> Option<Action> {
        Self::WRITES.iter().copied().find(|action| action.as_str() == key)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical data-access call flowing through the middleware chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub model: String,
    pub action: Action,
    #[serde(default)]
    pub args: Value,
    /// The operation this one was found in, if it is nested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Arc<Operation>>,
    #[serde(default)]
    pub data_path: Vec<String>,
    #[serde(default)]
    pub run_in_transaction: bool,
}

impl Operation {
    pub fn new(model: impl Into<String>, action: Action, args: Value) -> Self {
        Self {
            model: model.into(),
            action,
            args,
            scope: None,
            data_path: Vec::new(),
            run_in_transaction: false,
        }
    }

    pub fn in_transaction(mut self) -> Self {
        self.run_in_transaction = true;
        self
    }

    /// Derive a nested operation scoped to `self`.
    pub fn child(&self, model: &str, action: Action, args: Value) -> Operation {
        Self::nested_in(&Arc::new(self.clone()), model, action, args)
    }

    /// Nested operation sharing an already captured parent snapshot.
    pub fn nested_in(scope: &Arc<Operation>, model: &str, action: Action, args: Value) -> Operation {
        Operation {
            model: model.to_string(),
            action,
            args,
            scope: Some(Arc::clone(scope)),
            data_path: scope.data_path.clone(),
            run_in_transaction: scope.run_in_transaction,
        }
    }

    /// Same operation with replaced arguments.
    pub fn with_args(&self, args: Value) -> Operation {
        Operation {
            args,
            ..self.clone()
        }
    }

    pub fn is_nested(&self) -> bool {
        self.scope.is_some()
    }

    /// Number of enclosing operations.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = self.scope.as_deref();
        while let Some(parent) = scope {
            depth += 1;
            scope = parent.scope.as_deref();
        }
        depth
    }
}
