//! BDD Tests for the mon connect and ping lifecycle

mod common;

use common::Harness;
use cucumber::{given, then, when, World};
use mon_lifecycle::{CephMon, Completion, MonError, MonKind, MonNode, PingResult};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Default, World)]
struct LifecycleWorld {
    harness: Option<Harness>,
    mon: Option<CephMon>,
    outcomes: Vec<Result<(), MonError>>,
    ping: Option<PingResult>,
}

impl LifecycleWorld {
    fn harness(&self) -> &Harness {
        self.harness.as_ref().expect("harness should be created first")
    }

    fn mon(&self) -> &CephMon {
        self.mon.as_ref().expect("mon should be registered first")
    }

    async fn register(&mut self, kind: MonKind, hostname: &str) {
        let record = self.harness().register(kind, hostname);
        let mon = CephMon::load(&record.uuid, self.harness().deps.clone())
            .await
            .expect("registered mon loads");
        self.mon = Some(mon);
    }
}

#[given("a lifecycle harness")]
async fn given_harness(world: &mut LifecycleWorld) {
    world.harness = Some(Harness::new());
}

#[given("a lifecycle harness with provisioning bypassed")]
async fn given_bypassing_harness(world: &mut LifecycleWorld) {
    world.harness = Some(Harness::bypassing_provisioning());
}

#[given(expr = "deployments fail with {string}")]
async fn given_deploy_failure(world: &mut LifecycleWorld, reason: String) {
    *world.harness().provisioner.fail_with.lock() = Some(reason);
}

#[given("the agent is unreachable")]
async fn given_unreachable(world: &mut LifecycleWorld) {
    world.harness().agent.unreachable.store(true, Ordering::SeqCst);
}

#[given(expr = "the agent answers pings with failure {string} and operation failure")]
async fn given_unhealthy_agent(world: &mut LifecycleWorld, error: String) {
    *world.harness().agent.ping_reply.lock() =
        json!({"success": false, "error": error, "operationFailure": true});
}

#[given(expr = "a backup storage mon on host {string}")]
async fn given_backup_mon(world: &mut LifecycleWorld, hostname: String) {
    world.register(MonKind::BackupStorage, &hostname).await;
}

#[given(expr = "a primary storage mon on host {string}")]
async fn given_primary_mon(world: &mut LifecycleWorld, hostname: String) {
    world.register(MonKind::PrimaryStorage, &hostname).await;
}

#[given("the mon is connected")]
async fn given_connected(world: &mut LifecycleWorld) {
    world
        .mon()
        .connect_and_wait()
        .await
        .expect("connect should succeed");
}

#[when("I connect the mon")]
async fn when_connect(world: &mut LifecycleWorld) {
    let outcome = timeout(WAIT, world.mon().connect_and_wait())
        .await
        .expect("connect should finish");
    world.outcomes.push(outcome);
}

#[when(expr = "I connect the mon {int} times concurrently")]
async fn when_connect_concurrently(world: &mut LifecycleWorld, count: usize) {
    let promises: Vec<_> = (0..count)
        .map(|_| {
            let (completion, promise) = Completion::channel();
            world.mon().connect(completion);
            promise
        })
        .collect();

    for promise in promises {
        let outcome = timeout(WAIT, promise).await.expect("connect should finish");
        world.outcomes.push(outcome);
    }
}

#[when("I ping the mon")]
async fn when_ping(world: &mut LifecycleWorld) {
    let outcome = timeout(WAIT, world.mon().ping_and_wait())
        .await
        .expect("ping should finish");
    match outcome {
        Ok(result) => {
            world.ping = Some(result);
            world.outcomes.push(Ok(()));
        }
        Err(err) => world.outcomes.push(Err(err)),
    }
}

#[when("I connect and then ping the mon without waiting")]
async fn when_connect_then_ping(world: &mut LifecycleWorld) {
    let (connect, connected) = Completion::channel();
    let (ping, pinged) = Completion::channel();
    world.mon().connect(connect);
    world.mon().ping(ping);

    let connect_outcome = timeout(WAIT, connected).await.expect("connect should finish");
    world.outcomes.push(connect_outcome);
    let ping_outcome = timeout(WAIT, pinged).await.expect("ping should not be blocked");
    match ping_outcome {
        Ok(result) => {
            world.ping = Some(result);
            world.outcomes.push(Ok(()));
        }
        Err(err) => world.outcomes.push(Err(err)),
    }
}

#[then("the operation should succeed")]
async fn then_succeeded(world: &mut LifecycleWorld) {
    let outcome = world.outcomes.last().expect("an operation should have run");
    assert!(outcome.is_ok(), "expected success, got {outcome:?}");
}

#[then("all operations should succeed")]
async fn then_all_succeeded(world: &mut LifecycleWorld) {
    assert!(!world.outcomes.is_empty());
    for outcome in &world.outcomes {
        assert!(outcome.is_ok(), "expected success, got {outcome:?}");
    }
}

#[then(expr = "the operation should fail with {string}")]
async fn then_failed_with(world: &mut LifecycleWorld, message: String) {
    match world.outcomes.last().expect("an operation should have run") {
        Ok(()) => panic!("expected failure containing {message:?}"),
        Err(err) => assert!(
            err.to_string().contains(&message),
            "error {err} should mention {message:?}"
        ),
    }
}

#[then("the connect should fail and the ping should succeed")]
async fn then_connect_failed_ping_succeeded(world: &mut LifecycleWorld) {
    assert_eq!(world.outcomes.len(), 2);
    assert!(world.outcomes[0].is_err());
    assert!(world.outcomes[1].is_ok());
    assert!(world.ping.as_ref().is_some_and(|result| result.success));
}

#[then(expr = "the mon status should be {string}")]
async fn then_status(world: &mut LifecycleWorld, status: String) {
    assert_eq!(world.mon().status().to_string(), status);
    let stored = world
        .harness()
        .store
        .get(world.mon().uuid())
        .expect("mon is persisted");
    assert_eq!(stored.status.to_string(), status);
}

#[then(expr = "the agent should have been deployed {int} time(s)")]
async fn then_deployed(world: &mut LifecycleWorld, count: usize) {
    assert_eq!(world.harness().deploy_count(), count);
}

#[then(expr = "the agent should have received {int} calls")]
async fn then_agent_calls(world: &mut LifecycleWorld, count: usize) {
    assert_eq!(world.harness().agent_calls(), count);
}

#[then(expr = "the remote operations should be {string}")]
async fn then_remote_operations(world: &mut LifecycleWorld, expected: String) {
    let expected: Vec<String> = expected.split(',').map(str::to_string).collect();
    assert_eq!(world.harness().activity.log(), expected);
}

#[then(expr = "at most {int} remote operation should have been in flight")]
async fn then_max_in_flight(world: &mut LifecycleWorld, count: usize) {
    assert!(world.harness().activity.max_in_flight() <= count);
}

#[then(expr = "the ping result should be unsuccessful with error {string}")]
async fn then_ping_unsuccessful(world: &mut LifecycleWorld, error: String) {
    let result = world.ping.as_ref().expect("ping should have produced a result");
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(error.as_str()));
}

#[then("the ping result should flag an operation failure")]
async fn then_ping_operation_failure(world: &mut LifecycleWorld) {
    let result = world.ping.as_ref().expect("ping should have produced a result");
    assert!(result.operation_failure);
}

#[tokio::main]
async fn main() {
    LifecycleWorld::run("tests/features").await;
}
