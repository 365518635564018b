//! Deployment against a recording backend.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use botflow::deploy::{DeployQueue, DeployStatus, Deployer, InMemoryBots, container_name};
use botflow::error::FormatError;
use botflow::format::{PythonNormalizer, SourceFormatter};
use helpers::*;
use serde_json::json;

fn greeter(id: u64) -> botflow::parse::Bot {
    bot(id, vec![trigger(1, "/start", &[2]), send_text(2, "Hello", &[])])
}

#[tokio::test]
async fn first_deploy_without_existing_container_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = Arc::new(RecordingBackend::new());
    let deployer = deployer_for(vec![greeter(42)], backend.clone(), tmp.path());

    let result = deployer.deploy(42).await;

    assert_eq!(result.status, DeployStatus::Success, "{}", result.message);
    assert_eq!(
        backend.calls(),
        vec![
            "build bot-42",
            "inspect bot-container-42",
            "run bot-42 as bot-container-42 cpu=1024 mem=256m",
        ]
    );
    assert_eq!(backend.running(), vec!["bot-container-42"]);

    let workspace = tmp.path().join("bot-42");
    assert!(workspace.join("Dockerfile").is_file());
    let source = std::fs::read_to_string(workspace.join("bot.py")).unwrap();
    assert!(source.contains("async def on_message_1("));
}

#[tokio::test]
async fn redeploy_replaces_running_container() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = Arc::new(RecordingBackend::with_container(&container_name(5)));
    let deployer = deployer_for(vec![greeter(5)], backend.clone(), tmp.path());

    assert!(deployer.deploy(5).await.is_success());
    assert_eq!(
        backend.calls(),
        vec![
            "build bot-5",
            "inspect bot-container-5",
            "stop bot-container-5",
            "rm bot-container-5",
            "run bot-5 as bot-container-5 cpu=1024 mem=256m",
        ]
    );

    // Deploying again ends in the same single-container state.
    assert!(deployer.deploy(5).await.is_success());
    assert_eq!(backend.running(), vec!["bot-container-5"]);
}

#[tokio::test]
async fn unknown_bot_is_an_error_result() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = Arc::new(RecordingBackend::new());
    let deployer = deployer_for(vec![], backend.clone(), tmp.path());

    let result = deployer.deploy(404).await;
    assert_eq!(result.status, DeployStatus::Error);
    assert!(result.message.contains("404"));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn compile_errors_stop_before_the_backend() {
    let tmp = tempfile::tempdir().unwrap();
    let broken = bot(
        8,
        vec![
            trigger(1, "x", &[2]),
            node(2, "Switch", json!({"values": ["only"]}), &[]),
        ],
    );
    let backend = Arc::new(RecordingBackend::new());
    let deployer = deployer_for(vec![broken], backend.clone(), tmp.path());

    let result = deployer.deploy(8).await;
    assert_eq!(result.status, DeployStatus::Error);
    assert!(result.message.starts_with("compilation failed: [Validate:V001]"));
    assert!(backend.calls().is_empty());
    assert!(!tmp.path().join("bot-8").exists());
}

#[tokio::test]
async fn backend_failure_is_reported_not_raised() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = Arc::new(RecordingBackend::failing_on("build"));
    let deployer = deployer_for(vec![greeter(3)], backend.clone(), tmp.path());

    let result = deployer.deploy(3).await;
    assert_eq!(result.status, DeployStatus::Error);
    assert!(result.message.contains("build failed"));
    assert_eq!(backend.calls(), vec!["build bot-3"]);
}

#[tokio::test]
async fn result_serializes_to_status_and_message() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = Arc::new(RecordingBackend::new());
    let deployer = deployer_for(vec![greeter(1)], backend, tmp.path());

    let value = serde_json::to_value(deployer.deploy(1).await).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(value.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn step_timeout_bounds_slow_backend_calls() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = Arc::new(RecordingBackend::slow(Duration::from_secs(5)));
    let store = botflow::deploy::InMemoryBots::new();
    store.insert(greeter(6));
    let settings = botflow::Settings {
        workspace_root: tmp.path().to_path_buf(),
        step_timeout_secs: Some(0),
        ..botflow::Settings::default()
    };
    let deployer = botflow::deploy::Deployer::new(Arc::new(store), backend, settings);

    let result = deployer.deploy(6).await;
    assert_eq!(result.status, DeployStatus::Error);
    assert!(result.message.contains("did not finish"), "{}", result.message);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queue_serializes_deploys_per_bot() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = Arc::new(RecordingBackend::slow(Duration::from_millis(30)));
    let deployer = deployer_for(vec![greeter(1), greeter(2)], backend.clone(), tmp.path());
    let queue = DeployQueue::start(Arc::new(deployer));

    let tickets: Vec<_> = (0..3)
        .flat_map(|_| [queue.submit(1), queue.submit(2)])
        .collect();
    for ticket in tickets {
        let bot_id = ticket.bot_id();
        let result = ticket.wait().await;
        assert!(result.is_success(), "bot {}: {}", bot_id, result.message);
    }
    queue.shutdown().await;

    assert!(backend.overlapping_builds().is_empty());
    let builds = backend.calls().iter().filter(|c| c.starts_with("build")).count();
    assert_eq!(builds, 6);
    assert_eq!(backend.running(), vec!["bot-container-1", "bot-container-2"]);
}

#[tokio::test]
async fn shutdown_drains_pending_work() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = Arc::new(RecordingBackend::new());
    let deployer = deployer_for(vec![greeter(9)], backend.clone(), tmp.path());
    let queue = DeployQueue::start(Arc::new(deployer));

    let first = queue.submit(9);
    let second = queue.submit(9);
    queue.shutdown().await;

    assert!(first.wait().await.is_success());
    assert!(second.wait().await.is_success());
    assert_eq!(
        backend.calls().iter().filter(|c| c.starts_with("run")).count(),
        2
    );
}

async fn wait_for_idle_lanes(queue: &DeployQueue) {
    for _ in 0..200 {
        if queue.active_lanes() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} lane(s) still active", queue.active_lanes());
}

#[tokio::test]
async fn finished_lanes_are_released() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = Arc::new(RecordingBackend::slow(Duration::from_millis(200)));
    let deployer = deployer_for(vec![greeter(1), greeter(2)], backend.clone(), tmp.path());
    let queue = DeployQueue::start(Arc::new(deployer));

    let first = queue.submit(1);
    let second = queue.submit(2);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(queue.active_lanes(), 2);

    assert!(first.wait().await.is_success());
    assert!(second.wait().await.is_success());
    wait_for_idle_lanes(&queue).await;

    // A later deploy of the same bot opens a fresh lane and releases it again.
    assert!(queue.submit(1).wait().await.is_success());
    wait_for_idle_lanes(&queue).await;

    queue.shutdown().await;
    let builds = backend.calls().iter().filter(|c| c.starts_with("build")).count();
    assert_eq!(builds, 3);
}

/// Blocks the calling thread whenever the source mentions `marker`.
struct SlowFormatter {
    marker: &'static str,
    delay: Duration,
}

impl SourceFormatter for SlowFormatter {
    fn format(&self, source: &str) -> Result<String, FormatError> {
        if source.contains(self.marker) {
            std::thread::sleep(self.delay);
        }
        PythonNormalizer::default().format(source)
    }
}

#[tokio::test]
async fn slow_compile_does_not_stall_other_bots() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = Arc::new(RecordingBackend::new());
    let store = InMemoryBots::new();
    store.insert(bot(
        1,
        vec![trigger(1, "heavy", &[2]), code(2, "heavy_work = 1", &[])],
    ));
    store.insert(greeter(2));
    let settings = botflow::Settings {
        workspace_root: tmp.path().to_path_buf(),
        ..botflow::Settings::default()
    };
    let formatter = Arc::new(SlowFormatter {
        marker: "heavy_work",
        delay: Duration::from_millis(600),
    });
    let deployer = Deployer::with_formatter(Arc::new(store), backend, formatter, settings);
    let queue = DeployQueue::start(Arc::new(deployer));

    let heavy = queue.submit(1);
    let light = queue.submit(2);

    let light = tokio::time::timeout(Duration::from_millis(500), light.wait())
        .await
        .expect("deploy of bot 2 waited for bot 1's compile");
    assert!(light.is_success(), "{}", light.message);
    assert!(heavy.wait().await.is_success());
    queue.shutdown().await;
}
