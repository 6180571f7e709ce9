use super::NestedMiddleware;
use crate::core::{NestedError, NestedResult, Operation};
use crate::extract::{SiteLocator, WriteSite};
use crate::middleware::Next;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

type ReadySender = Arc<Mutex<Option<oneshot::Sender<NestedResult<Operation>>>>>;

/// A nested write running in its own task.
///
/// Two single-use channels connect it to the parent: `ready` fires when the
/// nested middleware reaches its continuation (or fails before that), and
/// `result_slot` later releases that continuation with the parent's result.
pub(super) struct PendingInvocation {
    pub relation: String,
    pub locator: SiteLocator,
    ready: Option<oneshot::Receiver<NestedResult<Operation>>>,
    result_slot: Option<oneshot::Sender<NestedResult<Value>>>,
    outcome: Option<JoinHandle<NestedResult<Value>>>,
    finished: Option<NestedResult<Value>>,
}

impl PendingInvocation {
    /// Spawn the nested invocation for `site`.
    pub fn dispatch(coordinator: &NestedMiddleware, site: WriteSite) -> Self {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel::<NestedResult<Value>>();
        let ready_tx: ReadySender = Arc::new(Mutex::new(Some(ready_tx)));

        let continuation = {
            let ready_tx = Arc::clone(&ready_tx);
            let locator = site.locator.clone();
            Next::new(move |operation: Operation| {
                signal(&ready_tx, Ok(operation));
                async move {
                    result_rx.await.unwrap_or_else(|_| {
                        Err(NestedError::Settlement(format!(
                            "parent of nested write at '{}' went away before settling it",
                            locator
                        )))
                    })
                }
            })
        };

        let coordinator = coordinator.clone();
        let operation = site.operation;
        let outcome = tokio::spawn(async move {
            let outcome = coordinator.handle_operation(operation, continuation).await;
            if let Err(err) = &outcome {
                // only lands if the continuation was never reached
                signal(&ready_tx, Err(err.clone()));
            }
            outcome
        });

        Self {
            relation: site.relation,
            locator: site.locator,
            ready: Some(ready_rx),
            result_slot: Some(result_tx),
            outcome: Some(outcome),
            finished: None,
        }
    }

    /// Wait until the nested middleware reached its continuation.
    ///
    /// When the ready channel closes without a signal the invocation has ended,
    /// so its outcome decides: a failure (including a panic) fails the
    /// barrier, a clean return means nothing to write back (`None`). Returning
    /// without calling `next` is accepted here rather than left to stall the
    /// parent; the returned value still becomes the relation's result slice.
    pub async fn ready(&mut self) -> NestedResult<Option<Operation>> {
        let Some(ready) = self.ready.take() else {
            return Ok(None);
        };
        match ready.await {
            Ok(Ok(operation)) => Ok(Some(operation)),
            Ok(Err(err)) => Err(err),
            Err(_) => {
                let finished = self.join().await;
                self.finished = Some(finished.clone());
                finished.map(|_| None)
            }
        }
    }

    /// Release the nested continuation with its share of the result.
    pub fn settle(&mut self, value: NestedResult<Value>) {
        if let Some(slot) = self.result_slot.take() {
            // the nested side may have finished without waiting
            let _ = slot.send(value);
        }
    }

    /// Wait for the nested invocation as a whole.
    pub async fn outcome(&mut self) -> NestedResult<Value> {
        match self.finished.take() {
            Some(finished) => finished,
            None => self.join().await,
        }
    }

    async fn join(&mut self) -> NestedResult<Value> {
        match self.outcome.take() {
            Some(handle) => handle.await?,
            None => Ok(Value::Null),
        }
    }
}

fn signal(ready: &ReadySender, value: NestedResult<Operation>) {
    let sender = ready
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    if let Some(sender) = sender {
        let _ = sender.send(value);
    }
}
