//! Mon connection lifecycle

use crate::flows::{CheckToolsFlow, DeployAgentFlow, EchoAgentFlow};
use crate::profile::{BackupStorage, MonProfile, PrimaryStorage};
use agent_client::{AgentClient, PingCmd, PingRsp};
use async_trait::async_trait;
use cephmon_core::{
    Completion, DeployRequest, FileSyncPair, MonConfig, MonError, MonKind, MonRecord, MonStatus,
    MonStore, PingResult, Provisioner, Result, SshTarget,
};
use flow_engine::FlowChain;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use task_chain::{ChainTask, ChainTaskQueue};
use tracing::{debug, info, instrument, warn};

/// Collaborators a mon needs, injected at construction.
#[derive(Clone)]
pub struct MonDeps {
    pub store: Arc<dyn MonStore>,
    pub agent: AgentClient,
    pub provisioner: Arc<dyn Provisioner>,
    pub queue: ChainTaskQueue,
    pub config: Arc<MonConfig>,
}

impl fmt::Debug for MonDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonDeps")
            .field("agent", &self.agent)
            .field("queue", &self.queue)
            .field("config", &self.config)
            .finish()
    }
}

/// Lifecycle operations every mon kind supports.
#[async_trait]
pub trait MonNode: Send + Sync {
    fn uuid(&self) -> &str;

    fn status(&self) -> MonStatus;

    /// Deploy and verify the agent, then mark the mon connected. Serialized
    /// with every other operation on this mon.
    fn connect(&self, completion: Completion<()>);

    /// Health-check the agent. An unhealthy mon is a successful ping with
    /// `success = false`; only transport problems fail the completion.
    fn ping(&self, completion: Completion<PingResult>);

    /// Persist a new status. A no-op when the status is unchanged.
    async fn change_status(&self, status: MonStatus) -> Result<()>;

    async fn connect_and_wait(&self) -> Result<()> {
        let (completion, promise) = Completion::channel();
        self.connect(completion);
        promise.await
    }

    async fn ping_and_wait(&self) -> Result<PingResult> {
        let (completion, promise) = Completion::channel();
        self.ping(completion);
        promise.await
    }
}

struct MonInner {
    uuid: String,
    sync_id: String,
    record: RwLock<MonRecord>,
    deps: MonDeps,
}

/// Lifecycle shared by every mon kind; `P` supplies the kind's paths,
/// package and signature.
pub struct MonBase<P: MonProfile> {
    inner: Arc<MonInner>,
    _profile: PhantomData<fn() -> P>,
}

pub type BackupStorageMon = MonBase<BackupStorage>;
pub type PrimaryStorageMon = MonBase<PrimaryStorage>;

impl<P: MonProfile> Clone for MonBase<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _profile: PhantomData,
        }
    }
}

impl<P: MonProfile> fmt::Debug for MonBase<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.inner.record.read();
        f.debug_struct("MonBase")
            .field("kind", &P::KIND)
            .field("uuid", &self.inner.uuid)
            .field("hostname", &record.hostname)
            .field("status", &record.status)
            .finish()
    }
}

impl<P: MonProfile> MonBase<P> {
    pub fn new(record: MonRecord, deps: MonDeps) -> Result<Self> {
        if record.kind != P::KIND {
            return Err(MonError::Config {
                reason: format!(
                    "mon {} is a {} mon, expected {}",
                    record.uuid,
                    record.kind,
                    P::KIND
                ),
            });
        }
        Ok(Self {
            inner: Arc::new(MonInner {
                uuid: record.uuid.clone(),
                sync_id: format!("{}-{}", P::SYNC_PREFIX, record.uuid),
                record: RwLock::new(record),
                deps,
            }),
            _profile: PhantomData,
        })
    }

    pub async fn load(uuid: &str, deps: MonDeps) -> Result<Self> {
        let record = deps.store.load(uuid).await?;
        Self::new(record, deps)
    }

    /// Snapshot of the mon as last persisted.
    pub fn record(&self) -> MonRecord {
        self.inner.record.read().clone()
    }

    /// Key every lifecycle operation on this mon is serialized under.
    pub fn sync_signature(&self) -> &str {
        &self.inner.sync_id
    }

    fn deps(&self) -> &MonDeps {
        &self.inner.deps
    }

    #[instrument(skip(self, completion), fields(mon_uuid = %self.inner.uuid))]
    async fn do_connect(&self, completion: Completion<()>) {
        if let Err(err) = self.change_status(MonStatus::Connecting).await {
            completion.fail(err);
            return;
        }

        let outcome = match self.connect_flow_chain().execute().await {
            Ok(_) => self.change_status(MonStatus::Connected).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(()) => {
                info!("ceph {} mon connected", P::KIND);
                completion.success(());
            }
            Err(err) => {
                warn!(error = %err, "failed to connect ceph {} mon", P::KIND);
                if let Err(status_err) = self.change_status(MonStatus::Disconnected).await {
                    warn!(error = %status_err, "unable to record disconnected status");
                }
                completion.fail(err);
            }
        }
    }

    fn connect_flow_chain(&self) -> FlowChain {
        let record = self.record();
        let chain = FlowChain::new(format!(
            "connect-mon-{}-ceph-{}-{}",
            record.hostname,
            P::KIND,
            record.storage_uuid
        ))
        .allow_empty();

        let deps = self.deps();
        if deps.config.bypass_provisioning {
            debug!("provisioning bypassed, connecting without deployment");
            return chain;
        }

        chain
            .then(CheckToolsFlow::new(deps.config.required_tools.clone()))
            .then(DeployAgentFlow::new(
                deps.provisioner.clone(),
                self.deploy_request(&record),
            ))
            .then(EchoAgentFlow::new(
                deps.agent.clone(),
                record.hostname.clone(),
                record.agent_port,
                P::ECHO_PATH,
            ))
    }

    fn deploy_request(&self, record: &MonRecord) -> DeployRequest {
        let config = &self.deps().config;
        let profile = config.profile(P::KIND);
        let lib_name = config
            .shared_lib_package
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "zstacklib.tar.gz".to_string());

        DeployRequest {
            target: SshTarget {
                hostname: record.hostname.clone(),
                port: record.ssh_port,
                username: record.ssh_username.clone(),
                password: record.ssh_password.clone(),
            },
            files: vec![
                FileSyncPair {
                    src: config.shared_lib_package.clone(),
                    dest: format!("{}/{}", profile.remote_dir, lib_name),
                },
                FileSyncPair {
                    src: config.package_path(P::KIND),
                    dest: format!("{}/{}", profile.remote_dir, profile.package_name),
                },
            ],
            playbook: profile.playbook_name.clone(),
            agent_port: record.agent_port,
            arguments: BTreeMap::from([(
                P::PACKAGE_ARGUMENT.to_string(),
                profile.package_name.clone(),
            )]),
        }
    }

    #[instrument(skip(self), fields(mon_uuid = %self.inner.uuid))]
    async fn do_ping(&self) -> Result<PingResult> {
        let record = self.record();
        let rsp: PingRsp = self
            .deps()
            .agent
            .call(
                &record.hostname,
                record.agent_port,
                P::PING_PATH,
                &PingCmd::for_mon(&record),
            )
            .await?;

        if !rsp.success {
            debug!(
                error = rsp.error.as_deref().unwrap_or(""),
                operation_failure = rsp.operation_failure,
                "agent reported unhealthy mon"
            );
        }
        Ok(rsp.into())
    }
}

#[async_trait]
impl<P: MonProfile> MonNode for MonBase<P> {
    fn uuid(&self) -> &str {
        &self.inner.uuid
    }

    fn status(&self) -> MonStatus {
        self.inner.record.read().status
    }

    fn connect(&self, completion: Completion<()>) {
        let mon = self.clone();
        let name = format!("connect-{}", self.inner.sync_id);
        self.deps().queue.submit(ChainTask::new(
            self.inner.sync_id.clone(),
            name,
            move |chain| async move {
                let completion = completion.on_complete(move || chain.next());
                mon.do_connect(completion).await;
            },
        ));
    }

    fn ping(&self, completion: Completion<PingResult>) {
        let mon = self.clone();
        let name = format!("ping-{}", self.inner.sync_id);
        self.deps().queue.submit(ChainTask::new(
            self.inner.sync_id.clone(),
            name,
            move |chain| async move {
                let completion = completion.on_complete(move || chain.next());
                completion.complete(mon.do_ping().await);
            },
        ));
    }

    async fn change_status(&self, status: MonStatus) -> Result<()> {
        let mut record = self.record();
        if record.status == status {
            return Ok(());
        }

        let old_status = record.status;
        record.status = status;
        let refreshed = self.deps().store.update_and_refresh(record).await?;
        *self.inner.record.write() = refreshed;
        debug!(
            mon_uuid = %self.inner.uuid,
            from = %old_status,
            to = %status,
            "ceph {} mon changed status",
            P::KIND
        );
        Ok(())
    }
}

/// A mon of either kind, chosen by the record's `kind`.
#[derive(Debug, Clone)]
pub enum CephMon {
    BackupStorage(BackupStorageMon),
    PrimaryStorage(PrimaryStorageMon),
}

impl CephMon {
    pub fn new(record: MonRecord, deps: MonDeps) -> Result<Self> {
        Ok(match record.kind {
            MonKind::BackupStorage => CephMon::BackupStorage(MonBase::new(record, deps)?),
            MonKind::PrimaryStorage => CephMon::PrimaryStorage(MonBase::new(record, deps)?),
        })
    }

    pub async fn load(uuid: &str, deps: MonDeps) -> Result<Self> {
        let record = deps.store.load(uuid).await?;
        Self::new(record, deps)
    }

    pub fn kind(&self) -> MonKind {
        match self {
            CephMon::BackupStorage(_) => MonKind::BackupStorage,
            CephMon::PrimaryStorage(_) => MonKind::PrimaryStorage,
        }
    }

    pub fn record(&self) -> MonRecord {
        match self {
            CephMon::BackupStorage(mon) => mon.record(),
            CephMon::PrimaryStorage(mon) => mon.record(),
        }
    }

    pub fn sync_signature(&self) -> &str {
        match self {
            CephMon::BackupStorage(mon) => mon.sync_signature(),
            CephMon::PrimaryStorage(mon) => mon.sync_signature(),
        }
    }
}

#[async_trait]
impl MonNode for CephMon {
    fn uuid(&self) -> &str {
        match self {
            CephMon::BackupStorage(mon) => mon.uuid(),
            CephMon::PrimaryStorage(mon) => mon.uuid(),
        }
    }

    fn status(&self) -> MonStatus {
        match self {
            CephMon::BackupStorage(mon) => mon.status(),
            CephMon::PrimaryStorage(mon) => mon.status(),
        }
    }

    fn connect(&self, completion: Completion<()>) {
        match self {
            CephMon::BackupStorage(mon) => mon.connect(completion),
            CephMon::PrimaryStorage(mon) => mon.connect(completion),
        }
    }

    fn ping(&self, completion: Completion<PingResult>) {
        match self {
            CephMon::BackupStorage(mon) => mon.ping(completion),
            CephMon::PrimaryStorage(mon) => mon.ping(completion),
        }
    }

    async fn change_status(&self, status: MonStatus) -> Result<()> {
        match self {
            CephMon::BackupStorage(mon) => mon.change_status(status).await,
            CephMon::PrimaryStorage(mon) => mon.change_status(status).await,
        }
    }
}
