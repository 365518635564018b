#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use botflow::SourceUnit;
use botflow::deploy::{ContainerBackend, ContainerHandle, Deployer, InMemoryBots};
use botflow::error::{BackendError, CompilerError};
use botflow::format::PythonNormalizer;
use botflow::parse::{Bot, EdgeRecord, Markup, MarkupCell, MarkupType, NodeId, NodeRecord};
use botflow::settings::{ResourceLimits, Settings};

// =============================================================================
// Bot builders
// =============================================================================

pub fn bot(id: u64, nodes: Vec<NodeRecord>) -> Bot {
    Bot {
        id,
        token: "123456:TEST-TOKEN".into(),
        name: Some(format!("bot {}", id)),
        nodes,
    }
}

/// Node with the given kind, parameters (a JSON object) and successors.
pub fn node(id: u64, kind: &str, parameters: Value, outgoing: &[u64]) -> NodeRecord {
    let parameters = match parameters {
        Value::Object(map) => map,
        Value::Null => Default::default(),
        other => panic!("parameters must be an object, got {}", other),
    };
    NodeRecord {
        id: NodeId(id),
        kind: kind.into(),
        parameters,
        outgoing: outgoing
            .iter()
            .map(|&target| EdgeRecord {
                target: NodeId(target),
            })
            .collect(),
        markup: None,
    }
}

pub fn trigger(id: u64, text: &str, outgoing: &[u64]) -> NodeRecord {
    node(id, "OnMessage", json!({ "text": text }), outgoing)
}

pub fn send_text(id: u64, text: &str, outgoing: &[u64]) -> NodeRecord {
    node(id, "SendMessage", json!({ "text": text }), outgoing)
}

pub fn switch(id: u64, expression: &str, values: Value, outgoing: &[u64]) -> NodeRecord {
    node(
        id,
        "Switch",
        json!({ "expression": expression, "values": values }),
        outgoing,
    )
}

pub fn code(id: u64, source: &str, outgoing: &[u64]) -> NodeRecord {
    node(id, "Code", json!({ "code": source }), outgoing)
}

/// Attach a keyboard; each cell is `(text, target)`.
pub fn with_markup(
    mut node: NodeRecord,
    markup_type: MarkupType,
    rows: Vec<Vec<(&str, Option<u64>)>>,
) -> NodeRecord {
    node.markup = Some(Markup {
        markup_type,
        rows: rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(text, target)| MarkupCell {
                        text: text.into(),
                        target: target.map(NodeId),
                    })
                    .collect()
            })
            .collect(),
    });
    node
}

// =============================================================================
// Compilation
// =============================================================================

pub fn try_compile(bot: &Bot) -> Result<SourceUnit, Vec<CompilerError>> {
    botflow::compile(bot, &PythonNormalizer::default(), &Settings::default())
}

pub fn compile_ok(bot: &Bot) -> SourceUnit {
    match try_compile(bot) {
        Ok(unit) => unit,
        Err(errors) => panic!("compile failed: {}", botflow::error::describe(&errors)),
    }
}

/// Byte offset of `needle` in `haystack`, panicking with context when absent.
pub fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("`{}` not found in:\n{}", needle, haystack))
}

/// Number of `async def` handlers with the given name.
pub fn definitions(source: &str, handler: &str) -> usize {
    source.matches(&format!("async def {}(", handler)).count()
}

// =============================================================================
// Recording container backend
// =============================================================================

/// In-memory container engine that records every call.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<String>>,
    containers: Mutex<HashMap<String, String>>,
    active: Mutex<HashMap<String, usize>>,
    overlaps: Mutex<HashSet<String>>,
    fail_on: Option<&'static str>,
    delay: Option<Duration>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend where a container with `name` already runs.
    pub fn with_container(name: &str) -> Self {
        let backend = Self::default();
        backend
            .containers
            .lock()
            .unwrap()
            .insert(name.to_string(), format!("old-{}", name));
        backend
    }

    /// Fail every call whose verb is `verb` (`build`, `inspect`, `stop`, `rm`, `run`).
    pub fn failing_on(verb: &'static str) -> Self {
        Self {
            fail_on: Some(verb),
            ..Self::default()
        }
    }

    /// Sleep `delay` inside every build, widening race windows.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self.containers.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Tags whose builds ever ran concurrently with another build of the same tag.
    pub fn overlapping_builds(&self) -> HashSet<String> {
        self.overlaps.lock().unwrap().clone()
    }

    fn record(&self, verb: &str, call: String) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push(call.clone());
        if self.fail_on == Some(verb) {
            return Err(BackendError::CommandFailed {
                command: call,
                status: "exit status: 1".into(),
                stderr: format!("{} failed", verb),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerBackend for RecordingBackend {
    async fn build_image(
        &self,
        context_dir: &Path,
        descriptor: &str,
        tag: &str,
    ) -> Result<(), BackendError> {
        {
            let mut active = self.active.lock().unwrap();
            let count = active.entry(tag.to_string()).or_insert(0);
            *count += 1;
            if *count > 1 {
                self.overlaps.lock().unwrap().insert(tag.to_string());
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(count) = self.active.lock().unwrap().get_mut(tag) {
            *count -= 1;
        }
        assert!(context_dir.join(descriptor).exists(), "descriptor missing");
        self.record("build", format!("build {}", tag))
    }

    async fn get_container(&self, name: &str) -> Result<Option<ContainerHandle>, BackendError> {
        self.record("inspect", format!("inspect {}", name))?;
        Ok(self
            .containers
            .lock()
            .unwrap()
            .get(name)
            .map(|id| ContainerHandle {
                id: id.clone(),
                name: name.to_string(),
            }))
    }

    async fn stop(&self, container: &ContainerHandle) -> Result<(), BackendError> {
        self.record("stop", format!("stop {}", container.name))
    }

    async fn remove(&self, container: &ContainerHandle) -> Result<(), BackendError> {
        self.record("rm", format!("rm {}", container.name))?;
        self.containers.lock().unwrap().remove(&container.name);
        Ok(())
    }

    async fn run(
        &self,
        tag: &str,
        name: &str,
        limits: &ResourceLimits,
    ) -> Result<ContainerHandle, BackendError> {
        self.record(
            "run",
            format!("run {} as {} cpu={} mem={}", tag, name, limits.cpu_shares, limits.memory),
        )?;
        let mut containers = self.containers.lock().unwrap();
        let id = format!("{}-{}", name, containers.len() + 1);
        containers.insert(name.to_string(), id.clone());
        Ok(ContainerHandle {
            id,
            name: name.to_string(),
        })
    }
}

// =============================================================================
// Deployer wiring
// =============================================================================

pub fn deployer_for(
    bots: Vec<Bot>,
    backend: Arc<RecordingBackend>,
    workspace_root: &Path,
) -> Deployer {
    let store = InMemoryBots::new();
    for bot in bots {
        store.insert(bot);
    }
    let settings = Settings {
        workspace_root: workspace_root.to_path_buf(),
        ..Settings::default()
    };
    Deployer::new(Arc::new(store), backend, settings)
}
