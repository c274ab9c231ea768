//! # Progress Tracking Module
//!
//! Punto unico in cui vengono riportate tutte le azioni della run: log
//! `tracing`, eventi JSON (con `--json`) e spinner. Thread-safe, viene
//! clonato in ogni task del worker pool.

use crate::{
    config::RunOptions,
    json_output::JsonMessage,
    platform::ToolCommand,
    progress::{FileOutcome, ProgressManager, RunStats},
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Reporter condiviso tra executor e driver
#[derive(Clone)]
pub struct ProgressTracker {
    json_output: bool,
    stats: Arc<Mutex<RunStats>>,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    pub fn new(options: &RunOptions) -> Self {
        let progress_manager = if options.json_output {
            ProgressManager::hidden()
        } else {
            ProgressManager::new()
        };

        Self {
            json_output: options.json_output,
            stats: Arc::new(Mutex::new(RunStats::new())),
            progress_manager,
        }
    }

    /// Destination directory created, or about to be in dry run
    pub fn directory(&self, path: &Path, dry_run: bool) {
        if dry_run {
            info!("Would create {}", path.display());
        } else {
            info!("Created {}", path.display());
        }

        if self.json_output {
            JsonMessage::directory(path, dry_run).emit();
        }
    }

    pub fn skipping(&self, dest_file: &Path) {
        info!("File exists, skipping {}", dest_file.display());
    }

    pub fn overwriting(&self, dest_file: &Path, dry_run: bool) {
        if dry_run {
            info!("Would overwrite {}", dest_file.display());
        } else {
            info!("Overwriting {}", dest_file.display());
        }
    }

    pub fn invoking(&self, command: &ToolCommand) {
        info!("{}", command);
    }

    pub fn linking(&self, source: &Path, dest_file: &Path) {
        info!("Hard-linking {} to {}", source.display(), dest_file.display());
    }

    /// Record the outcome of one file
    pub async fn file_complete(&self, source: &Path, dest_file: &Path, outcome: &FileOutcome) {
        self.stats.lock().await.record(outcome);

        let name = source.file_name().unwrap_or_default().to_string_lossy();
        let message = match outcome {
            FileOutcome::Done => format!("[OK] {}", name),
            FileOutcome::Skipped => format!("[SKIP] {}", name),
            FileOutcome::WouldRun(intent) => {
                info!("Would {}", intent);
                format!("[DRY] {}", name)
            }
            FileOutcome::Failed(reason) => {
                warn!("Failed {}: {}", source.display(), reason);
                format!("[ERROR] {}", name)
            }
        };
        self.progress_manager.update(&message);

        if self.json_output {
            JsonMessage::file_complete(source, dest_file, outcome).emit();
        }
    }

    /// Linking is impossible between the roots; the whole tree goes to the sync tool
    pub fn fallback(&self, reason: &str, command: &ToolCommand) {
        warn!("Another file system, cannot hard-link ({})", reason);
        info!("{}", command);

        if self.json_output {
            JsonMessage::fallback(reason.to_string(), command.display()).emit();
        }
    }

    pub async fn fallback_finished(&self, result: Result<(), String>) {
        match &result {
            Ok(()) => info!("Fallback sync completed"),
            Err(e) => error!("Fallback sync failed: {}", e),
        }
        self.stats.lock().await.fallback_synced = Some(result.is_ok());
    }

    /// Snapshot of the counters
    pub async fn stats(&self) -> RunStats {
        self.stats.lock().await.clone()
    }

    /// Finalizza lo spinner
    pub fn finish(&self, summary: &str) {
        self.progress_manager.finish(summary);
    }
}
