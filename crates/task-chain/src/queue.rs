//! Signature-keyed task chains
//!
//! Tasks sharing a sync signature run one at a time in submission order;
//! tasks with different signatures run concurrently on the tokio runtime.
//! A running task holds a [`SyncTaskChain`] and releases its signature by
//! calling [`SyncTaskChain::next`], which is independent of whether the task
//! itself succeeded.

use cephmon_core::{MonError, Result};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
type TaskFn = Box<dyn FnOnce(SyncTaskChain) -> TaskFuture + Send + 'static>;

/// A unit of work submitted under a sync signature.
pub struct ChainTask {
    signature: String,
    name: String,
    run: TaskFn,
}

impl ChainTask {
    pub fn new<F, Fut>(signature: impl Into<String>, name: impl Into<String>, run: F) -> Self
    where
        F: FnOnce(SyncTaskChain) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            signature: signature.into(),
            name: name.into(),
            run: Box::new(move |chain| Box::pin(run(chain))),
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ChainTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainTask")
            .field("signature", &self.signature)
            .field("name", &self.name)
            .finish()
    }
}

/// Handle a running task uses to let the next task with its signature start.
///
/// Dropping the handle without calling [`next`](Self::next) also advances the
/// chain, so a task that panics cannot wedge its signature.
#[must_use = "the chain advances as soon as this handle is dropped"]
pub struct SyncTaskChain {
    queue: Option<Arc<QueueInner>>,
    signature: String,
    name: String,
}

impl SyncTaskChain {
    pub fn next(mut self) {
        self.advance();
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn advance(&mut self) {
        if let Some(queue) = self.queue.take() {
            debug!(signature = %self.signature, task = %self.name, "chain task released");
            queue.advance(&self.signature);
        }
    }
}

impl Drop for SyncTaskChain {
    fn drop(&mut self) {
        self.advance();
    }
}

impl fmt::Debug for SyncTaskChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncTaskChain")
            .field("signature", &self.signature)
            .field("name", &self.name)
            .field("released", &self.queue.is_none())
            .finish()
    }
}

struct QueueInner {
    handle: Handle,
    /// A key is present while a task with that signature is running; the
    /// deque holds the tasks waiting behind it. One lock covers admission,
    /// queueing and release for every signature.
    chains: Mutex<HashMap<String, VecDeque<ChainTask>>>,
}

impl QueueInner {
    fn spawn(self: &Arc<Self>, task: ChainTask) {
        let ChainTask {
            signature,
            name,
            run,
        } = task;
        debug!(%signature, task = %name, "running chain task");
        let chain = SyncTaskChain {
            queue: Some(self.clone()),
            signature,
            name,
        };
        self.handle.spawn(async move { run(chain).await });
    }

    fn advance(self: &Arc<Self>, signature: &str) {
        let next = {
            let mut chains = self.chains.lock();
            match chains.get_mut(signature) {
                Some(waiting) => {
                    let next = waiting.pop_front();
                    if next.is_none() {
                        chains.remove(signature);
                    }
                    next
                }
                None => {
                    warn!(%signature, "advanced a chain with no running task");
                    None
                }
            }
        };

        if let Some(task) = next {
            self.spawn(task);
        }
    }
}

/// Serializes tasks per signature on a shared tokio runtime.
#[derive(Clone)]
pub struct ChainTaskQueue {
    inner: Arc<QueueInner>,
}

impl fmt::Debug for ChainTaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainTaskQueue")
            .field("active_signatures", &self.inner.chains.lock().len())
            .finish()
    }
}

impl ChainTaskQueue {
    pub fn new(handle: Handle) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                handle,
                chains: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Queue running on the runtime of the calling task.
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| MonError::NoRuntime)?;
        Ok(Self::new(handle))
    }

    /// Run `task` now if nothing with its signature is running, otherwise
    /// queue it behind the tasks already submitted under that signature.
    /// Never blocks on the task itself.
    pub fn submit(&self, task: ChainTask) {
        let admitted = match self.inner.chains.lock().entry(task.signature.clone()) {
            Entry::Occupied(mut waiting) => {
                debug!(
                    signature = %task.signature,
                    task = %task.name,
                    ahead = waiting.get().len() + 1,
                    "chain task queued"
                );
                waiting.get_mut().push_back(task);
                None
            }
            Entry::Vacant(slot) => {
                slot.insert(VecDeque::new());
                Some(task)
            }
        };

        if let Some(task) = admitted {
            self.inner.spawn(task);
        }
    }

    /// Number of tasks waiting behind the running one for `signature`.
    pub fn pending(&self, signature: &str) -> usize {
        self.inner
            .chains
            .lock()
            .get(signature)
            .map(|waiting| waiting.len())
            .unwrap_or(0)
    }

    pub fn is_running(&self, signature: &str) -> bool {
        self.inner.chains.lock().contains_key(signature)
    }

    /// Number of signatures with a running task.
    pub fn active_signatures(&self) -> usize {
        self.inner.chains.lock().len()
    }
}
