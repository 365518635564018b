//! Per-bot workspace: `<workspace_root>/bot-<id>/` holding the build
//! descriptor and the generated program.

use std::io;
use std::path::PathBuf;

use tokio::fs;

use crate::settings::Settings;

use super::image_tag;

/// Build descriptor used when no template file is configured.
pub const DEFAULT_DESCRIPTOR: &str = "\
FROM python:3.11-slim

WORKDIR /app
RUN pip install --no-cache-dir aiogram==3.*

COPY bot.py .

CMD [\"python\", \"-u\", \"bot.py\"]
";

/// Directory for `bot_id`; shares its name with the image tag.
pub fn workspace_dir(settings: &Settings, bot_id: u64) -> PathBuf {
    settings.workspace_root.join(image_tag(bot_id))
}

/// Write the descriptor and program into the bot's workspace, creating it
/// when absent. Existing files are overwritten.
pub async fn materialize(settings: &Settings, bot_id: u64, source: &str) -> io::Result<PathBuf> {
    let dir = workspace_dir(settings, bot_id);
    fs::create_dir_all(&dir).await?;

    let descriptor = match &settings.descriptor_template {
        Some(path) => fs::read_to_string(path).await?,
        None => DEFAULT_DESCRIPTOR.to_string(),
    };
    fs::write(dir.join(&settings.descriptor_name), descriptor).await?;
    fs::write(dir.join(&settings.source_file_name), source).await?;

    log::debug!("materialized workspace {}", dir.display());
    Ok(dir)
}
