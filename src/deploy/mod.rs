//! Deployment: materialize the generated program, build an image and replace
//! the running container for the bot.

pub mod backend;
pub mod docker;
pub mod orchestrator;
pub mod queue;
pub mod store;
pub mod workspace;

pub use backend::{ContainerBackend, ContainerHandle};
pub use docker::DockerCli;
pub use orchestrator::Deployer;
pub use queue::{DeployQueue, DeployTicket};
pub use store::{BotSource, InMemoryBots, JsonDirectoryBots};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStatus {
    Success,
    Error,
}

/// The only result shape a deploy reports to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub status: DeployStatus,
    pub message: String,
}

impl DeploymentResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: DeployStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: DeployStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeployStatus::Success
    }
}

/// Image tag for a bot: `bot-<id>`.
pub fn image_tag(bot_id: u64) -> String {
    format!("bot-{}", bot_id)
}

/// Container name for a bot: `bot-container-<id>`.
pub fn container_name(bot_id: u64) -> String {
    format!("bot-container-{}", bot_id)
}
