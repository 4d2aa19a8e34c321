//! Error types for mon lifecycle management

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonError>;

#[derive(Error, Debug)]
pub enum MonError {
    #[error("Agent call to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Agent call to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Unable to decode agent response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("Invalid agent endpoint: {reason}")]
    InvalidEndpoint { reason: String },

    #[error("Malformed agent response: {reason}")]
    MalformedResponse { reason: String },

    #[error("Missing required tools on management node: {tools}")]
    MissingTools { tools: String },

    #[error("Provisioning of {host} failed: {reason}")]
    Provisioning { host: String, reason: String },

    #[error("Flow chain {chain} has no flows")]
    EmptyFlowChain { chain: String },

    #[error("Flow {flow} panicked: {reason}")]
    FlowPanicked { flow: String, reason: String },

    #[error("Mon not found: {uuid}")]
    MonNotFound { uuid: String },

    #[error("Persistence failed: {reason}")]
    Persistence { reason: String },

    #[error("Completion dropped before it was fired")]
    CompletionDropped,

    #[error("No tokio runtime available to run tasks")]
    NoRuntime,

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Serialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl MonError {
    /// Whether this error came from the agent transport rather than from
    /// provisioning or local bookkeeping.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            MonError::Transport { .. }
                | MonError::Timeout { .. }
                | MonError::Decode { .. }
                | MonError::MalformedResponse { .. }
        )
    }
}
