//! Fake collaborators for lifecycle tests

#![allow(dead_code)]

use agent_client::{AgentClient, AgentTransport};
use async_trait::async_trait;
use cephmon_core::{
    DeployRequest, InMemoryMonStore, MonConfig, MonError, MonKind, MonRecord, Provisioner, Result,
};
use mon_lifecycle::MonDeps;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use task_chain::ChainTaskQueue;
use tokio::sync::Barrier;

const STEP_DELAY: Duration = Duration::from_millis(10);

/// Records which remote operations ran, in order, and how many overlapped.
#[derive(Debug, Default)]
pub struct Activity {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl Activity {
    async fn track(&self, label: String) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.log.lock().push(label);
        tokio::time::sleep(STEP_DELAY).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct FakeProvisioner {
    activity: Arc<Activity>,
    pub fail_with: Mutex<Option<String>>,
    pub gate: Mutex<Option<Arc<Barrier>>>,
    pub requests: Mutex<Vec<DeployRequest>>,
}

#[async_trait]
impl Provisioner for FakeProvisioner {
    async fn deploy(&self, request: DeployRequest) -> Result<()> {
        self.requests.lock().push(request.clone());
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.wait().await;
        }
        self.activity.track("deploy".to_string()).await;

        let failure = self.fail_with.lock().clone();
        match failure {
            Some(reason) => Err(MonError::Provisioning {
                host: request.target.hostname,
                reason,
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
pub struct FakeAgent {
    activity: Arc<Activity>,
    pub ping_reply: Mutex<Value>,
    pub echo_fails: AtomicBool,
    pub unreachable: AtomicBool,
    pub calls: AtomicUsize,
    pub urls: Mutex<Vec<String>>,
}

impl FakeAgent {
    fn refused(url: &str) -> MonError {
        MonError::Transport {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl AgentTransport for FakeAgent {
    async fn post_json(&self, url: &str, _body: Value, _timeout: Duration) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());
        self.activity.track("ping".to_string()).await;
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Self::refused(url));
        }
        Ok(self.ping_reply.lock().clone())
    }

    async fn echo(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());
        self.activity.track("echo".to_string()).await;
        if self.echo_fails.load(Ordering::SeqCst) || self.unreachable.load(Ordering::SeqCst) {
            return Err(Self::refused(url));
        }
        Ok(())
    }
}

/// Store, fakes and injected dependencies wired together.
#[derive(Debug)]
pub struct Harness {
    pub store: Arc<InMemoryMonStore>,
    pub provisioner: Arc<FakeProvisioner>,
    pub agent: Arc<FakeAgent>,
    pub activity: Arc<Activity>,
    pub deps: MonDeps,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn bypassing_provisioning() -> Self {
        Self::with_config(MonConfig {
            bypass_provisioning: true,
            ..test_config()
        })
    }

    pub fn with_config(config: MonConfig) -> Self {
        let activity = Arc::new(Activity::default());
        let store = Arc::new(InMemoryMonStore::new());
        let provisioner = Arc::new(FakeProvisioner {
            activity: activity.clone(),
            fail_with: Mutex::new(None),
            gate: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        });
        let agent = Arc::new(FakeAgent {
            activity: activity.clone(),
            ping_reply: Mutex::new(json!({"success": true})),
            echo_fails: AtomicBool::new(false),
            unreachable: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        });
        let config = Arc::new(config);
        let deps = MonDeps {
            store: store.clone(),
            agent: AgentClient::new(agent.clone(), config.agent_timeout()),
            provisioner: provisioner.clone(),
            queue: ChainTaskQueue::current().expect("tests run inside tokio"),
            config,
        };
        Self {
            store,
            provisioner,
            agent,
            activity,
            deps,
        }
    }

    /// Persist a fresh, disconnected mon and return its record.
    pub fn register(&self, kind: MonKind, hostname: &str) -> MonRecord {
        let port = self.deps.config.profile(kind).agent_port;
        let record = MonRecord::new(kind, format!("{hostname}-storage"), hostname, port)
            .with_ssh("root", "password", 22);
        self.store.insert(record.clone());
        record
    }

    pub fn agent_calls(&self) -> usize {
        self.agent.calls.load(Ordering::SeqCst)
    }

    pub fn deploy_count(&self) -> usize {
        self.provisioner.requests.lock().len()
    }
}

/// Defaults with no required tools, so the tool check passes anywhere.
pub fn test_config() -> MonConfig {
    MonConfig {
        required_tools: Vec::new(),
        agent_timeout_ms: 1_000,
        ..MonConfig::default()
    }
}
