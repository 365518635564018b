//! [`ContainerBackend`] backed by the `docker` command-line client.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::BackendError;
use crate::settings::ResourceLimits;

use super::backend::{ContainerBackend, ContainerHandle};

pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run the client with `args`, returning stdout on success.
    async fn exec(&self, args: &[String]) -> Result<String, BackendError> {
        let command = format!("{} {}", self.binary, args.join(" "));
        log::debug!("running {}", command);

        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| BackendError::Spawn {
                program: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BackendError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[async_trait]
impl ContainerBackend for DockerCli {
    async fn build_image(
        &self,
        context_dir: &Path,
        descriptor: &str,
        tag: &str,
    ) -> Result<(), BackendError> {
        self.exec(&build_args(context_dir, descriptor, tag)).await?;
        Ok(())
    }

    async fn get_container(&self, name: &str) -> Result<Option<ContainerHandle>, BackendError> {
        let stdout = self.exec(&lookup_args(name)).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|id| ContainerHandle {
                id: id.to_string(),
                name: name.to_string(),
            }))
    }

    async fn stop(&self, container: &ContainerHandle) -> Result<(), BackendError> {
        self.exec(&["stop".to_string(), container.id.clone()]).await?;
        Ok(())
    }

    async fn remove(&self, container: &ContainerHandle) -> Result<(), BackendError> {
        self.exec(&["rm".to_string(), container.id.clone()]).await?;
        Ok(())
    }

    async fn run(
        &self,
        tag: &str,
        name: &str,
        limits: &ResourceLimits,
    ) -> Result<ContainerHandle, BackendError> {
        let stdout = self.exec(&run_args(tag, name, limits)).await?;
        Ok(ContainerHandle {
            id: stdout.trim().to_string(),
            name: name.to_string(),
        })
    }
}

fn build_args(context_dir: &Path, descriptor: &str, tag: &str) -> Vec<String> {
    vec![
        "build".into(),
        "-f".into(),
        context_dir.join(descriptor).display().to_string(),
        "-t".into(),
        tag.into(),
        context_dir.display().to_string(),
    ]
}

/// Exact-name match; docker's name filter is otherwise a substring search.
fn lookup_args(name: &str) -> Vec<String> {
    vec![
        "ps".into(),
        "-a".into(),
        "--filter".into(),
        format!("name=^/{}$", name),
        "--format".into(),
        "{{.ID}}".into(),
    ]
}

fn run_args(tag: &str, name: &str, limits: &ResourceLimits) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "run".into(),
        "-d".into(),
        "--name".into(),
        name.into(),
        "--cpu-shares".into(),
        limits.cpu_shares.to_string(),
        "--memory".into(),
        limits.memory.clone(),
    ];
    if limits.privileged {
        args.push("--privileged".into());
    }
    args.push(tag.into());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_uses_descriptor_inside_workspace() {
        let args = build_args(Path::new("/srv/bots/bot-7"), "Dockerfile", "bot-7");
        assert_eq!(
            args,
            vec!["build", "-f", "/srv/bots/bot-7/Dockerfile", "-t", "bot-7", "/srv/bots/bot-7"]
        );
    }

    #[test]
    fn lookup_anchors_the_name() {
        assert_eq!(lookup_args("bot-container-7")[3], "name=^/bot-container-7$");
    }

    #[test]
    fn run_applies_limits() {
        let limits = ResourceLimits::default();
        assert_eq!(
            run_args("bot-7", "bot-container-7", &limits),
            vec![
                "run", "-d", "--name", "bot-container-7", "--cpu-shares", "1024", "--memory",
                "256m", "--privileged", "bot-7"
            ]
        );

        let unprivileged = ResourceLimits {
            privileged: false,
            ..ResourceLimits::default()
        };
        assert!(!run_args("bot-7", "c", &unprivileged).contains(&"--privileged".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_reports_status() {
        let docker = DockerCli::new("false");
        let err = docker
            .build_image(Path::new("/tmp"), "Dockerfile", "bot-1")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::CommandFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let docker = DockerCli::new("botflow-no-such-docker");
        let err = docker.get_container("x").await.unwrap_err();
        assert!(matches!(err, BackendError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn empty_lookup_output_means_absent() {
        let docker = DockerCli::new("true");
        assert_eq!(docker.get_container("bot-container-1").await.unwrap(), None);
    }
}
