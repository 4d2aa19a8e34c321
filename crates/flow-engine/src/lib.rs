pub use cephmon_core;

mod chain;
mod data;

pub use chain::{Flow, FlowChain, FnFlow, ReversibleFlow};
pub use data::FlowData;

// Re-export core types for convenience
pub use cephmon_core::{Completion, MonError, Result};
