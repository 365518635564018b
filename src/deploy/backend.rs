//! Contract of the container engine that builds and runs bot images.

use std::path::Path;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::settings::ResourceLimits;

/// A container known to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait ContainerBackend: Send + Sync {
    /// Build `tag` from `context_dir` using the descriptor file `descriptor`
    /// inside it.
    async fn build_image(
        &self,
        context_dir: &Path,
        descriptor: &str,
        tag: &str,
    ) -> Result<(), BackendError>;

    /// Look up a container by exact name. `Ok(None)` when it does not exist.
    async fn get_container(&self, name: &str) -> Result<Option<ContainerHandle>, BackendError>;

    async fn stop(&self, container: &ContainerHandle) -> Result<(), BackendError>;

    async fn remove(&self, container: &ContainerHandle) -> Result<(), BackendError>;

    /// Start `tag` detached as `name` under `limits`.
    async fn run(
        &self,
        tag: &str,
        name: &str,
        limits: &ResourceLimits,
    ) -> Result<ContainerHandle, BackendError>;
}
