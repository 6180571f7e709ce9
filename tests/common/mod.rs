#![allow(dead_code)]

use nested_middleware::catalog::{FieldMeta, ModelMeta};
use nested_middleware::{Dmmf, NestedError, NestedResult, Next, Operation, RelationCatalog};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Blog schema used across the integration tests.
pub fn blog_dmmf() -> Dmmf {
    Dmmf::new(vec![
        ModelMeta {
            name: "User".into(),
            fields: vec![
                FieldMeta::scalar("id", "Int"),
                FieldMeta::scalar("email", "String"),
                FieldMeta::scalar("name", "String"),
                FieldMeta::relation("posts", "Post", "PostToUser", true),
                FieldMeta::relation("comments", "Comment", "CommentToUser", true),
                FieldMeta::relation("profile", "Profile", "ProfileToUser", false),
            ],
        },
        ModelMeta {
            name: "Post".into(),
            fields: vec![
                FieldMeta::scalar("id", "Int"),
                FieldMeta::scalar("title", "String"),
                FieldMeta::relation("author", "User", "PostToUser", false),
                FieldMeta::relation("comments", "Comment", "CommentToPost", true),
            ],
        },
        ModelMeta {
            name: "Comment".into(),
            fields: vec![
                FieldMeta::scalar("id", "Int"),
                FieldMeta::scalar("content", "String"),
                FieldMeta::relation("author", "User", "CommentToUser", false),
                FieldMeta::relation("post", "Post", "CommentToPost", false),
                FieldMeta::relation("repliedTo", "Comment", "Replies", false),
                FieldMeta::relation("replies", "Comment", "Replies", true),
            ],
        },
        ModelMeta {
            name: "Profile".into(),
            fields: vec![
                FieldMeta::scalar("bio", "String"),
                FieldMeta::relation("user", "User", "ProfileToUser", false),
            ],
        },
    ])
}

pub fn blog_catalog() -> RelationCatalog {
    RelationCatalog::from_dmmf(&blog_dmmf())
}

/// Records every operation that reaches the downstream continuation.
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Operation>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continuation that records the operation and resolves with `result`.
    pub fn next(&self, result: Value) -> Next {
        let calls = Arc::clone(&self.calls);
        Next::new(move |operation: Operation| async move {
            calls.lock().unwrap().push(operation);
            Ok(result)
        })
    }

    /// Continuation that records the operation and fails with `err`.
    pub fn failing_next(&self, err: NestedError) -> Next {
        let calls = Arc::clone(&self.calls);
        Next::new(move |operation: Operation| async move {
            calls.lock().unwrap().push(operation);
            Err(err)
        })
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().unwrap().clone()
    }

    /// The only recorded operation.
    pub fn single(&self) -> Operation {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one downstream call");
        calls.into_iter().next().unwrap()
    }
}

/// Shared ordered event log for concurrency assertions.
#[derive(Clone, Default)]
pub struct Events {
    inner: Arc<Mutex<Vec<String>>>,
}

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.inner.lock().unwrap().push(event.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.inner.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> usize {
        self.all()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("event '{}' never happened", event))
    }
}

pub async fn wait(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub fn passthrough(operation: Operation, next: Next) -> impl std::future::Future<Output = NestedResult<Value>> + Send {
    next.run(operation)
}
