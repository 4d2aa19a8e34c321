//! Flow chain execution
//!
//! A [`FlowChain`] runs its flows strictly in declaration order against a
//! shared [`FlowData`]. When a flow fails, the flows that already completed
//! are rolled back in reverse order (flows without a rollback are skipped)
//! and only then is the originating error reported. The outcome is reported
//! exactly once.
//!
//! Each flow runs on its own tokio task, so a panicking flow fails the chain
//! with [`MonError::FlowPanicked`] instead of tearing down the caller.

use crate::data::FlowData;
use async_trait::async_trait;
use cephmon_core::{Completion, MonError, Result};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinError;
use tracing::{debug, instrument, warn};

/// A forward-only step.
#[async_trait]
pub trait Flow: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, data: &FlowData) -> Result<()>;
}

/// A step that can undo itself when a later step fails.
#[async_trait]
pub trait ReversibleFlow: Flow {
    async fn rollback(&self, data: &FlowData);
}

/// Flow built from a closure.
pub struct FnFlow<F> {
    name: String,
    run: F,
}

impl<F, Fut> FnFlow<F>
where
    F: Fn(FlowData) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            name: name.into(),
            run,
        }
    }
}

#[async_trait]
impl<F, Fut> Flow for FnFlow<F>
where
    F: Fn(FlowData) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, data: &FlowData) -> Result<()> {
        (self.run)(data.clone()).await
    }
}

enum Step {
    NoRollback(Arc<dyn Flow>),
    Reversible(Arc<dyn ReversibleFlow>),
}

impl Step {
    fn name(&self) -> &str {
        match self {
            Step::NoRollback(flow) => flow.name(),
            Step::Reversible(flow) => flow.name(),
        }
    }

    async fn run(&self, data: &FlowData) -> Result<()> {
        let data = data.clone();
        let task = match self {
            Step::NoRollback(flow) => {
                let flow = flow.clone();
                tokio::spawn(async move { flow.run(&data).await })
            }
            Step::Reversible(flow) => {
                let flow = flow.clone();
                tokio::spawn(async move { flow.run(&data).await })
            }
        };

        match task.await {
            Ok(result) => result,
            Err(join) => Err(MonError::FlowPanicked {
                flow: self.name().to_string(),
                reason: join_reason(join),
            }),
        }
    }
}

fn join_reason(join: JoinError) -> String {
    if !join.is_panic() {
        return "cancelled".to_string();
    }
    let payload: Box<dyn Any + Send> = join.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Ordered list of flows with a single outcome.
pub struct FlowChain {
    name: String,
    steps: Vec<Step>,
    allow_empty: bool,
    data: FlowData,
}

impl fmt::Debug for FlowChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flows: Vec<&str> = self.steps.iter().map(Step::name).collect();
        f.debug_struct("FlowChain")
            .field("name", &self.name)
            .field("flows", &flows)
            .field("allow_empty", &self.allow_empty)
            .finish()
    }
}

impl FlowChain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            allow_empty: false,
            data: FlowData::new(),
        }
    }

    /// Let a chain with no flows complete immediately instead of failing.
    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    /// Start from an existing context instead of an empty one.
    pub fn with_data(mut self, data: FlowData) -> Self {
        self.data = data;
        self
    }

    pub fn then<F: Flow + 'static>(mut self, flow: F) -> Self {
        self.steps.push(Step::NoRollback(Arc::new(flow)));
        self
    }

    pub fn then_reversible<F: ReversibleFlow + 'static>(mut self, flow: F) -> Self {
        self.steps.push(Step::Reversible(Arc::new(flow)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every flow in order. Returns the shared context on success, or
    /// the error of the failing flow after rollback has finished.
    #[instrument(skip(self), fields(chain = %self.name, flows = self.steps.len()))]
    pub async fn execute(self) -> Result<FlowData> {
        if self.steps.is_empty() {
            if self.allow_empty {
                debug!("empty flow chain done");
                return Ok(self.data);
            }
            return Err(MonError::EmptyFlowChain { chain: self.name });
        }

        for (index, step) in self.steps.iter().enumerate() {
            debug!(flow = step.name(), "flow started");
            if let Err(err) = step.run(&self.data).await {
                warn!(flow = step.name(), error = %err, "flow failed, rolling back");
                self.rollback(index).await;
                return Err(err);
            }
            debug!(flow = step.name(), "flow done");
        }

        debug!("flow chain done");
        Ok(self.data)
    }

    /// Run the chain in the background and deliver its outcome to
    /// `completion`.
    pub fn start(self, completion: Completion<FlowData>) {
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    completion.complete(self.execute().await);
                });
            }
            Err(_) => completion.fail(MonError::NoRuntime),
        }
    }

    /// Roll back the first `completed` steps, newest first.
    async fn rollback(&self, completed: usize) {
        for step in self.steps[..completed].iter().rev() {
            let Step::Reversible(flow) = step else {
                continue;
            };
            debug!(flow = flow.name(), "rolling back flow");
            let flow = flow.clone();
            let data = self.data.clone();
            let name = flow.name().to_string();
            if let Err(join) = tokio::spawn(async move { flow.rollback(&data).await }).await {
                warn!(flow = %name, reason = %join_reason(join), "rollback panicked");
            }
        }
    }
}
