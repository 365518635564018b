//! Where the deployer reads bot documents from.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::DeployError;
use crate::parse::types::Bot;

/// Read-only access to stored bots.
#[async_trait]
pub trait BotSource: Send + Sync {
    async fn load(&self, bot_id: u64) -> Result<Bot, DeployError>;
}

/// Bots held in memory, keyed by id.
#[derive(Default)]
pub struct InMemoryBots {
    bots: RwLock<HashMap<u64, Bot>>,
}

impl InMemoryBots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bot: Bot) {
        if let Ok(mut bots) = self.bots.write() {
            bots.insert(bot.id, bot);
        }
    }
}

#[async_trait]
impl BotSource for InMemoryBots {
    async fn load(&self, bot_id: u64) -> Result<Bot, DeployError> {
        let bots = self.bots.read().map_err(|_| DeployError::Load {
            bot_id,
            message: "bot store lock poisoned".into(),
        })?;
        bots.get(&bot_id).cloned().ok_or_else(|| DeployError::Load {
            bot_id,
            message: "no such bot".into(),
        })
    }
}

/// One `<id>.json` document per bot in a directory.
pub struct JsonDirectoryBots {
    dir: PathBuf,
}

impl JsonDirectoryBots {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl BotSource for JsonDirectoryBots {
    async fn load(&self, bot_id: u64) -> Result<Bot, DeployError> {
        let path = self.dir.join(format!("{}.json", bot_id));
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| DeployError::Load {
                bot_id,
                message: format!("{}: {}", path.display(), e),
            })?;
        let bot = crate::parse::parse(&text).map_err(|errors| DeployError::Load {
            bot_id,
            message: crate::error::describe(&errors),
        })?;
        if bot.id != bot_id {
            return Err(DeployError::Load {
                bot_id,
                message: format!("{} holds bot {}", path.display(), bot.id),
            });
        }
        Ok(bot)
    }
}
