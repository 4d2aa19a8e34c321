pub use cephmon_core;

mod queue;

pub use queue::{ChainTask, ChainTaskQueue, SyncTaskChain};

// Re-export core types for convenience
pub use cephmon_core::{MonError, Result};
