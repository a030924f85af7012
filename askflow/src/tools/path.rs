//! User-supplied path strings.

use crate::errors::ToolError;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// A raw path string as the model sends it.
///
/// Use [`ToolPath::resolve`] to turn it into an absolute filesystem path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolPath(String);

impl ToolPath {
    /// Wraps a raw path string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the raw string is empty or only whitespace.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Resolves the path into an absolute, `~`-expanded, normalized path.
    ///
    /// Relative paths are resolved against the current working directory.
    pub fn resolve(&self) -> Result<PathBuf, ToolError> {
        if self.is_empty() {
            return Err(ToolError::invalid_path(&self.0, "path is empty"));
        }

        let expanded = self.expand_home()?;
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            let cwd = std::env::current_dir().map_err(|e| {
                ToolError::invalid_path(&self.0, format!("could not determine working directory: {e}"))
            })?;
            cwd.join(expanded)
        };

        Ok(normalize(&absolute))
    }

    fn expand_home(&self) -> Result<PathBuf, ToolError> {
        let Some(rest) = self.0.strip_prefix('~') else {
            return Ok(PathBuf::from(&self.0));
        };

        // "~user/..." would need a user database lookup.
        if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with(std::path::MAIN_SEPARATOR)) {
            return Err(ToolError::invalid_path(&self.0, "unknown home directory reference"));
        }

        let home = BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .ok_or_else(|| ToolError::invalid_path(&self.0, "could not determine home directory"))?;

        let rest = rest.trim_start_matches(['/', std::path::MAIN_SEPARATOR]);
        if rest.is_empty() {
            Ok(home)
        } else {
            Ok(home.join(rest))
        }
    }
}

impl From<&str> for ToolPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ToolPath {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ToolPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lexically removes `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
