//! # Agent Client
//!
//! Typed request/response calls against the HTTP agent running on a mon
//! host. Transport failures, timeouts and undecodable bodies come back as
//! errors; a well-formed response is returned as-is, even when it reports a
//! logical failure, so callers can tell reachability from health.

pub use cephmon_core;

mod client;
mod command;
mod transport;

pub use client::AgentClient;
pub use command::{AgentCmd, AgentResponse, AgentRsp, PingCmd, PingRsp};
pub use transport::{AgentTransport, HttpTransport};

// Re-export core types for convenience
pub use cephmon_core::{MonError, Result};
