//! Folder binding registry
//!
//! A binding ties one watched directory to a base-name pattern, a handler,
//! and the two archive directories created beneath it. Bindings are created
//! during startup wiring and never mutated afterwards; re-binding a path
//! replaces the old binding wholesale.

use crate::config::EngineConfig;
use crate::error::{IngestError, Result};
use crate::handler::SharedHandler;
use crate::patterns::NamePattern;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::info;

/// One watched directory and everything needed to process its files
pub struct FolderBinding {
    /// Absolute, canonical directory path (registry key)
    pub path: PathBuf,
    /// Base-name glob
    pub pattern: NamePattern,
    /// Handler invoked once per admitted file
    pub handler: SharedHandler,
    /// Destination for files whose handler succeeded
    pub processed_dir: PathBuf,
    /// Destination for files whose handler failed
    pub failed_dir: PathBuf,
}

impl fmt::Debug for FolderBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderBinding")
            .field("path", &self.path)
            .field("pattern", &self.pattern.as_str())
            .field("handler", &self.handler.name())
            .field("processed_dir", &self.processed_dir)
            .field("failed_dir", &self.failed_dir)
            .finish()
    }
}

impl FolderBinding {
    pub fn info(&self) -> BindingInfo {
        BindingInfo {
            path: self.path.clone(),
            pattern: self.pattern.as_str().to_string(),
            handler: self.handler.name().to_string(),
            processed_dir: self.processed_dir.clone(),
            failed_dir: self.failed_dir.clone(),
        }
    }
}

/// Plain-data view of a binding, for listings and startup logs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingInfo {
    pub path: PathBuf,
    pub pattern: String,
    pub handler: String,
    pub processed_dir: PathBuf,
    pub failed_dir: PathBuf,
}

/// Bindings keyed by canonical directory path
#[derive(Default)]
pub struct BindingRegistry {
    bindings: RwLock<BTreeMap<PathBuf, Arc<FolderBinding>>>,
}

impl fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("bindings", &self.len())
            .finish()
    }
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare `path` and its archive directories, then register the binding.
    ///
    /// Creates anything missing, so binding the same folder twice is safe.
    /// Fails when the path (or an archive dir) exists as a regular file, when
    /// directories cannot be created, or when the pattern does not compile.
    pub fn bind(
        &self,
        path: &Path,
        pattern: &str,
        handler: SharedHandler,
        config: &EngineConfig,
    ) -> Result<Arc<FolderBinding>> {
        let pattern = NamePattern::new(pattern)?;

        if path.exists() && !path.is_dir() {
            return Err(IngestError::NotADirectory(path.to_path_buf()));
        }
        fs::create_dir_all(path).map_err(|source| IngestError::BindPath {
            path: path.to_path_buf(),
            source,
        })?;
        let path = fs::canonicalize(path).map_err(|source| IngestError::BindPath {
            path: path.to_path_buf(),
            source,
        })?;

        let processed_dir = path.join(&config.processed_dir_name);
        let failed_dir = path.join(&config.failed_dir_name);
        for dir in [&processed_dir, &failed_dir] {
            if dir.exists() && !dir.is_dir() {
                return Err(IngestError::NotADirectory(dir.clone()));
            }
            fs::create_dir_all(dir).map_err(|source| IngestError::BindPath {
                path: dir.clone(),
                source,
            })?;
        }

        let binding = Arc::new(FolderBinding {
            path: path.clone(),
            pattern,
            handler,
            processed_dir,
            failed_dir,
        });

        let replaced = {
            let mut bindings = self.bindings.write().unwrap_or_else(|e| e.into_inner());
            bindings.insert(path.clone(), binding.clone()).is_some()
        };

        info!(
            binding = %path.display(),
            pattern = %binding.pattern.as_str(),
            handler = %binding.handler.name(),
            replaced,
            "Bound watched folder"
        );

        Ok(binding)
    }

    pub fn get(&self, path: &Path) -> Option<Arc<FolderBinding>> {
        let bindings = self.bindings.read().unwrap_or_else(|e| e.into_inner());
        bindings.get(path).cloned()
    }

    /// All bindings in path order. The lock is released before the caller uses them.
    pub fn snapshot(&self) -> Vec<Arc<FolderBinding>> {
        let bindings = self.bindings.read().unwrap_or_else(|e| e.into_inner());
        bindings.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
