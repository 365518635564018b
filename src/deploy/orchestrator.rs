//! Deploy one bot: compile, materialize, build, replace the running container.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::assemble::compile;
use crate::error::{BackendError, DeployError};
use crate::format::{self, SourceFormatter};
use crate::settings::Settings;

use super::backend::ContainerBackend;
use super::store::BotSource;
use super::{DeploymentResult, container_name, image_tag, workspace};

pub struct Deployer {
    source: Arc<dyn BotSource>,
    backend: Arc<dyn ContainerBackend>,
    formatter: Arc<dyn SourceFormatter>,
    settings: Settings,
}

impl Deployer {
    /// Deployer using the formatter selected by `settings`.
    pub fn new(
        source: Arc<dyn BotSource>,
        backend: Arc<dyn ContainerBackend>,
        settings: Settings,
    ) -> Self {
        let formatter: Arc<dyn SourceFormatter> = Arc::from(format::from_settings(&settings.formatter));
        Self::with_formatter(source, backend, formatter, settings)
    }

    pub fn with_formatter(
        source: Arc<dyn BotSource>,
        backend: Arc<dyn ContainerBackend>,
        formatter: Arc<dyn SourceFormatter>,
        settings: Settings,
    ) -> Self {
        Self {
            source,
            backend,
            formatter,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run a full deployment. Every failure is reported in the result.
    pub async fn deploy(&self, bot_id: u64) -> DeploymentResult {
        log::info!("deploying bot {}", bot_id);
        match self.try_deploy(bot_id).await {
            Ok(message) => {
                log::info!("bot {}: {}", bot_id, message);
                DeploymentResult::success(message)
            }
            Err(e) => {
                log::error!("deploy of bot {} failed: {}", bot_id, e);
                DeploymentResult::error(e.to_string())
            }
        }
    }

    async fn try_deploy(&self, bot_id: u64) -> Result<String, DeployError> {
        let bot = self.source.load(bot_id).await?;

        // Formatters may shell out; keep them off the async workers.
        let formatter = Arc::clone(&self.formatter);
        let settings = self.settings.clone();
        let unit = tokio::task::spawn_blocking(move || compile(&bot, formatter.as_ref(), &settings))
            .await?
            .map_err(DeployError::Compile)?;

        let dir = workspace::materialize(&self.settings, bot_id, &unit.source).await?;

        let tag = image_tag(bot_id);
        let name = container_name(bot_id);
        let backend = self.backend.as_ref();

        self.step(
            "build",
            backend.build_image(&dir, &self.settings.descriptor_name, &tag),
        )
        .await?;

        match self.step("inspect", backend.get_container(&name)).await? {
            Some(existing) => {
                log::info!("replacing container {} ({})", existing.name, existing.id);
                self.step("stop", backend.stop(&existing)).await?;
                self.step("remove", backend.remove(&existing)).await?;
            }
            None => log::info!("no running container {}; starting fresh", name),
        }

        let started = self
            .step("run", backend.run(&tag, &name, &self.settings.limits))
            .await?;

        Ok(format!(
            "bot {} running as {} ({} handler(s))",
            bot_id, started.name, unit.handler_count
        ))
    }

    /// Await a backend call, bounded by the configured step timeout.
    async fn step<T>(
        &self,
        command: &str,
        call: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, BackendError> {
        match self.settings.step_timeout_secs {
            Some(secs) => {
                let limit = Duration::from_secs(secs);
                tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| BackendError::Timeout {
                        command: command.to_string(),
                        timeout: limit,
                    })?
            }
            None => call.await,
        }
    }
}
