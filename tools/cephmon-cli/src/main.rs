use agent_client::AgentClient;
use anyhow::Context;
use async_trait::async_trait;
use cephmon_core::{
    endpoints, DeployRequest, InMemoryMonStore, MonConfig, MonError, MonKind, MonRecord,
    Provisioner, BUILD_INFO,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mon_lifecycle::{CephMon, MonDeps, MonNode};
use std::path::PathBuf;
use std::sync::Arc;
use task_chain::ChainTaskQueue;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cephmon")]
#[command(about = "Cephmon CLI - Ceph mon agent connect and health checks")]
#[command(version = cephmon_core::VERSION)]
struct Cli {
    /// JSON configuration file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the agent on a mon answers
    Echo(Target),
    /// Ask the agent whether the mon is healthy
    Ping {
        #[command(flatten)]
        target: Target,
        /// UUID of the storage the mon belongs to
        #[arg(long)]
        storage_uuid: String,
    },
    /// Deploy the agent to a mon and mark it connected
    Connect {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        storage_uuid: String,
        #[arg(long, default_value = "root")]
        ssh_username: String,
        #[arg(long, default_value = "")]
        ssh_password: String,
        #[arg(long, default_value_t = 22)]
        ssh_port: u16,
        /// Skip tool checks, deployment and echo
        #[arg(long)]
        bypass_provisioning: bool,
    },
}

#[derive(Args)]
struct Target {
    #[arg(long, value_enum)]
    kind: KindArg,
    #[arg(long)]
    host: String,
    /// Agent port; the kind's configured port when omitted
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    BackupStorage,
    PrimaryStorage,
}

impl From<KindArg> for MonKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::BackupStorage => MonKind::BackupStorage,
            KindArg::PrimaryStorage => MonKind::PrimaryStorage,
        }
    }
}

/// Stands in for the SSH/playbook collaborator, which this tool does not ship.
struct UnavailableProvisioner;

#[async_trait]
impl Provisioner for UnavailableProvisioner {
    async fn deploy(&self, request: DeployRequest) -> cephmon_core::Result<()> {
        Err(MonError::Provisioning {
            host: request.target.hostname,
            reason: "no provisioner is available; rerun with --bypass-provisioning".to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    debug!("{}", BUILD_INFO);
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Echo(target) => handle_echo(config, target).await,
        Commands::Ping {
            target,
            storage_uuid,
        } => handle_ping(config, target, storage_uuid).await,
        Commands::Connect {
            target,
            storage_uuid,
            ssh_username,
            ssh_password,
            ssh_port,
            bypass_provisioning,
        } => {
            let config = MonConfig {
                bypass_provisioning: config.bypass_provisioning || bypass_provisioning,
                ..config
            };
            let record = mon_record(&config, &target, storage_uuid)
                .with_ssh(ssh_username, ssh_password, ssh_port);
            handle_connect(config, record).await
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<MonConfig> {
    let config = match path {
        Some(path) => MonConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => MonConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn echo_path(kind: MonKind) -> &'static str {
    match kind {
        MonKind::BackupStorage => endpoints::BACKUP_STORAGE_ECHO,
        MonKind::PrimaryStorage => endpoints::PRIMARY_STORAGE_ECHO,
    }
}

fn mon_record(config: &MonConfig, target: &Target, storage_uuid: String) -> MonRecord {
    let kind = MonKind::from(target.kind);
    let port = target
        .port
        .unwrap_or_else(|| config.profile(kind).agent_port);
    MonRecord::new(kind, storage_uuid, target.host.clone(), port)
}

/// Load `record` into a fresh in-memory store and wrap it as a mon.
async fn ephemeral_mon(config: MonConfig, record: MonRecord) -> anyhow::Result<CephMon> {
    let store = Arc::new(InMemoryMonStore::new());
    store.insert(record.clone());
    let deps = MonDeps {
        store,
        agent: AgentClient::from_config(&config),
        provisioner: Arc::new(UnavailableProvisioner),
        queue: ChainTaskQueue::current()?,
        config: Arc::new(config),
    };
    Ok(CephMon::load(&record.uuid, deps).await?)
}

async fn handle_echo(config: MonConfig, target: Target) -> anyhow::Result<()> {
    let kind = MonKind::from(target.kind);
    let port = target.port.unwrap_or(config.profile(kind).agent_port);
    let agent = AgentClient::from_config(&config);

    agent.echo(&target.host, port, echo_path(kind)).await?;
    println!("{} agent on {}:{} is up", kind, target.host, port);
    Ok(())
}

async fn handle_ping(config: MonConfig, target: Target, storage_uuid: String) -> anyhow::Result<()> {
    let record = mon_record(&config, &target, storage_uuid);
    let mon = ephemeral_mon(config, record).await?;

    let result = mon.ping_and_wait().await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        anyhow::bail!(
            "mon {} is unhealthy: {}",
            target.host,
            result.error.as_deref().unwrap_or("no reason given")
        );
    }
    Ok(())
}

async fn handle_connect(config: MonConfig, record: MonRecord) -> anyhow::Result<()> {
    let hostname = record.hostname.clone();
    let mon = ephemeral_mon(config, record).await?;
    info!(mon = %mon.uuid(), %hostname, kind = %mon.kind(), "connecting mon");

    mon.connect_and_wait()
        .await
        .with_context(|| format!("connecting {} mon on {}", mon.kind(), hostname))?;
    println!("{} mon on {} is {}", mon.kind(), hostname, mon.status());
    Ok(())
}
