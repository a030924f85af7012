//! Built-in tools bundled with the application.
//!
//! Each tool is a configuration struct that implements both
//! [`ToolProvider`](crate::tools::ToolProvider) (to describe itself to the
//! model) and [`CommandFn`](crate::tools::CommandFn) (to execute a call).

mod command_execution;
mod directory_creation;
mod environment;
mod file_appending;
mod file_creation;
mod file_deletion;
mod file_reading;
mod stats;
mod system_info;

pub use command_execution::{CommandExecution, CommandExecutionArguments, CommandExecutionResult};
pub use directory_creation::{DirectoryCreation, DirectoryCreationArguments, DirectoryCreationResult};
pub use environment::{Environment, EnvironmentResult};
pub use file_appending::{FileAppending, FileAppendingArguments, FileAppendingResult};
pub use file_creation::{FileCreation, FileCreationArguments, FileCreationResult};
pub use file_deletion::{FileDeletion, FileDeletionArguments, FileDeletionResult};
pub use file_reading::{FileReading, FileReadingArguments, FileReadingResult, ReadLimits};
pub use stats::{Stats, StatsArguments, StatsResult};
pub use system_info::{SystemInfo, SystemInfoResult};

use super::path::ToolPath;
use crate::errors::ToolError;
use std::path::{Path, PathBuf};

/// Mode of newly created files.
pub const DEFAULT_FILE_PERMISSION: u32 = 0o644;

/// Mode of newly created directories.
pub const DEFAULT_DIR_PERMISSION: u32 = 0o755;

/// Resolves a required path argument.
fn require_path(path: &ToolPath, name: &str) -> Result<PathBuf, ToolError> {
    if path.is_empty() {
        return Err(ToolError::missing(name));
    }
    path.resolve()
}

/// Fails with a conflict if anything exists at `path`.
async fn conflict_if_exists(path: &Path) -> Result<(), ToolError> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => Err(ToolError::conflict(
            path.display().to_string(),
            "path exists but is a directory",
        )),
        Ok(_) => Err(ToolError::conflict(path.display().to_string(), "file already exists")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ToolError::io("checking path", &e)),
    }
}
