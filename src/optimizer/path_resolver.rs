//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di destinazione e la decisione
//! create/skip/overwrite per ogni file. La decisione viene ricalcolata ogni
//! volta, mai messa in cache: il filesystem può cambiare durante una run lunga.

use crate::{config::RunOptions, file_manager::FileTask};
use anyhow::Result;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// What the executor must do with the destination file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Skip,
    Overwrite,
}

/// Destination paths and decision for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationDecision {
    pub dest_dir: PathBuf,
    pub dest_file: PathBuf,
    pub needs_mkdir: bool,
    pub exists: bool,
    pub action: Action,
}

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Compute the destination of `task` under `dest_root`.
    pub fn plan(task: &FileTask, dest_root: &Path, options: &RunOptions) -> DestinationDecision {
        let dest_dir = normalize(&dest_root.join(&task.relative_dir));
        let dest_file = dest_dir.join(&task.file_name);

        let needs_mkdir = !dest_dir.is_dir();
        let exists = dest_file.is_file();

        let action = match (exists, options.overwrite) {
            (false, _) => Action::Create,
            (true, false) => Action::Skip,
            (true, true) => Action::Overwrite,
        };

        debug!(
            "Planned {} -> {} ({:?}, mkdir: {})",
            task.relative_path().display(),
            dest_file.display(),
            action,
            needs_mkdir
        );

        DestinationDecision {
            dest_dir,
            dest_file,
            needs_mkdir,
            exists,
            action,
        }
    }

    /// Create a directory with all its parents. A directory that appeared in
    /// the meantime (a sibling task created it) is not an error.
    pub async fn ensure_dir(dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create directory {}: {}", dir.display(), e))
    }
}

/// Lexically drop `.` components; `..` is kept as given.
fn normalize(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect();

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options(overwrite: bool) -> RunOptions {
        RunOptions { overwrite, ..Default::default() }
    }

    #[test]
    fn test_missing_destination_is_create() {
        let temp_dir = TempDir::new().unwrap();
        let task = FileTask::new("a", "x.jpg");

        let decision = PathResolver::plan(&task, temp_dir.path(), &options(false));

        assert_eq!(decision.dest_dir, temp_dir.path().join("a"));
        assert_eq!(decision.dest_file, temp_dir.path().join("a").join("x.jpg"));
        assert!(decision.needs_mkdir);
        assert!(!decision.exists);
        assert_eq!(decision.action, Action::Create);
    }

    #[test]
    fn test_existing_destination_skip_or_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("a")).unwrap();
        fs::write(temp_dir.path().join("a/x.jpg"), b"old").unwrap();
        let task = FileTask::new("a", "x.jpg");

        let skip = PathResolver::plan(&task, temp_dir.path(), &options(false));
        assert!(!skip.needs_mkdir);
        assert!(skip.exists);
        assert_eq!(skip.action, Action::Skip);

        let overwrite = PathResolver::plan(&task, temp_dir.path(), &options(true));
        assert_eq!(overwrite.action, Action::Overwrite);
    }

    #[test]
    fn test_directory_with_file_name_is_not_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("a/x.jpg")).unwrap();

        let decision = PathResolver::plan(&FileTask::new("a", "x.jpg"), temp_dir.path(), &options(false));
        assert!(!decision.exists);
        assert_eq!(decision.action, Action::Create);
    }

    #[test]
    fn test_dry_run_does_not_change_decision() {
        let temp_dir = TempDir::new().unwrap();
        let task = FileTask::new("a", "x.jpg");
        let dry = RunOptions { dry_run: true, ..Default::default() };

        assert_eq!(
            PathResolver::plan(&task, temp_dir.path(), &dry),
            PathResolver::plan(&task, temp_dir.path(), &options(false))
        );
    }

    #[test]
    fn test_plan_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let task = FileTask::new("nested/dir", "y.JPG");

        let first = PathResolver::plan(&task, temp_dir.path(), &options(false));
        let second = PathResolver::plan(&task, temp_dir.path(), &options(false));
        assert_eq!(first, second);
        assert!(!temp_dir.path().join("nested").exists());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("out/./a")), PathBuf::from("out/a"));
        assert_eq!(normalize(Path::new("./out/")), PathBuf::from("out"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
        assert_eq!(normalize(Path::new("out/../b")), PathBuf::from("out/../b"));
    }

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("a/b/c");

        PathResolver::ensure_dir(&dir).await.unwrap();
        PathResolver::ensure_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
    }
}
