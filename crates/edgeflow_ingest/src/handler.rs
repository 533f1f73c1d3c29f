//! Handler contract: the pluggable unit of work bound to a folder.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Converts one dropped file into a persisted record.
///
/// The engine calls `process_file` at least once per discovered file, and
/// possibly more than once across restarts, so implementations should upsert
/// by the record's natural key rather than blindly insert. A returned error
/// sends the file to the binding's failed directory.
#[async_trait]
pub trait FileHandler: Send + Sync {
    /// Short name used in logs and binding listings.
    fn name(&self) -> &str;

    async fn process_file(&self, path: &Path) -> anyhow::Result<()>;
}

/// Shared handle the registry keeps for each binding.
pub type SharedHandler = Arc<dyn FileHandler>;

/// Adapter turning an async closure into a [`FileHandler`].
pub struct FnHandler<F> {
    name: String,
    func: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    /// Wrap straight into the shared handle type.
    pub fn shared(name: impl Into<String>, func: F) -> SharedHandler
    where
        F: 'static,
    {
        Arc::new(Self::new(name, func))
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut> FileHandler for FnHandler<F>
where
    F: Fn(PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process_file(&self, path: &Path) -> anyhow::Result<()> {
        (self.func)(path.to_path_buf()).await
    }
}
