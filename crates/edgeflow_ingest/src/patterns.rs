//! Base-name glob matching for folder bindings.

use crate::error::{IngestError, Result};
use globset::{GlobBuilder, GlobMatcher};
use std::path::Path;

/// Compiled file-name pattern for a binding.
///
/// Patterns are matched against the base name only (`*.json`, `alert_??.json`),
/// never against the directory part, so a separator in the pattern can never match.
#[derive(Debug, Clone)]
pub struct NamePattern {
    raw: String,
    matcher: GlobMatcher,
}

impl NamePattern {
    /// Compile a glob. Empty patterns and patterns containing a path separator are rejected.
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IngestError::Pattern {
                pattern: raw.to_string(),
                message: "pattern is empty".to_string(),
            });
        }
        if trimmed.contains('/') || trimmed.contains('\\') {
            return Err(IngestError::Pattern {
                pattern: raw.to_string(),
                message: "pattern must match base names only".to_string(),
            });
        }

        let matcher = GlobBuilder::new(trimmed)
            .literal_separator(true)
            .build()
            .map_err(|e| IngestError::Pattern {
                pattern: raw.to_string(),
                message: e.to_string(),
            })?
            .compile_matcher();

        Ok(Self {
            raw: trimmed.to_string(),
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a bare file name.
    pub fn matches_name(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }

    /// Match the final component of `path`. Paths without a UTF-8 file name never match.
    pub fn matches_path(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| self.matches_name(n))
            .unwrap_or(false)
    }
}
