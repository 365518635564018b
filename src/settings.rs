//! Process-wide settings for compilation and deployment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Environment variables that override file settings.
pub mod env {
    pub const BASE_URL: &str = "BOTFLOW_BASE_URL";
    pub const WORKSPACE: &str = "BOTFLOW_WORKSPACE";
    pub const DOCKER: &str = "BOTFLOW_DOCKER";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Public base URL of the platform; file parameters are resolved against it.
    pub base_url: String,
    /// Parent directory of the per-bot workspaces.
    pub workspace_root: PathBuf,
    /// Build descriptor copied verbatim into each workspace. Falls back to the
    /// built-in descriptor when unset.
    pub descriptor_template: Option<PathBuf>,
    pub descriptor_name: String,
    pub source_file_name: String,
    pub docker_binary: String,
    pub limits: ResourceLimits,
    /// Upper bound for each backend call; unbounded when unset.
    pub step_timeout_secs: Option<u64>,
    pub formatter: FormatterSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            workspace_root: PathBuf::from("bots"),
            descriptor_template: None,
            descriptor_name: "Dockerfile".into(),
            source_file_name: "bot.py".into(),
            docker_binary: "docker".into(),
            limits: ResourceLimits::default(),
            step_timeout_secs: None,
            formatter: FormatterSettings::default(),
        }
    }
}

/// Quota applied to every bot container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    pub cpu_shares: u32,
    pub memory: String,
    pub privileged: bool,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_shares: 1024,
            memory: "256m".into(),
            privileged: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterSettings {
    /// External formatter command line (`["black", "-q", "-"]`). Empty selects
    /// the built-in normalizer.
    pub command: Vec<String>,
    pub tab_width: usize,
}

impl Default for FormatterSettings {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            tab_width: 4,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&text)?;
        Ok(settings)
    }

    /// Apply `BOTFLOW_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(env::BASE_URL) {
            self.base_url = url;
        }
        if let Some(dir) = lookup(env::WORKSPACE) {
            self.workspace_root = PathBuf::from(dir);
        }
        if let Some(docker) = lookup(env::DOCKER) {
            self.docker_binary = docker;
        }
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
