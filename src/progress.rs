//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche della run.
//!
//! ## Componenti principali:
//! - `FileOutcome`: Esito dell'elaborazione di un singolo file
//! - `ProgressManager`: Spinner `indicatif` con il numero di file gestiti
//! - `RunStats`: Contatori cumulativi per il report finale
//!
//! Il walk è lazy, quindi il numero totale di file non è noto in anticipo:
//! al posto di una barra con percentuale si usa uno spinner con contatore.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] 143 files  [OK] IMG_0042.jpg
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Result of handling one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The destination file was written or linked
    Done,
    /// The destination already existed and overwrite was not requested
    Skipped,
    /// Dry run: what would have been done
    WouldRun(String),
    /// This file was abandoned; the run goes on
    Failed(String),
}

impl FileOutcome {
    /// Short machine-friendly label
    pub fn label(&self) -> &'static str {
        match self {
            FileOutcome::Done => "done",
            FileOutcome::Skipped => "skipped",
            FileOutcome::WouldRun(_) => "would_run",
            FileOutcome::Failed(_) => "failed",
        }
    }

    /// Extra information carried by the outcome
    pub fn detail(&self) -> Option<&str> {
        match self {
            FileOutcome::WouldRun(detail) | FileOutcome::Failed(detail) => Some(detail),
            FileOutcome::Done | FileOutcome::Skipped => None,
        }
    }
}

/// Manages the progress spinner
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a spinner counting handled files
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} files  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A manager that never draws, for JSON output
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Count one more file and show a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters for one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub files_seen: usize,
    pub files_done: usize,
    pub files_skipped: usize,
    pub files_would_run: usize,
    pub errors: usize,
    /// Set when link mode fell back to the sync tool; `true` when the sync succeeded
    pub fallback_synced: Option<bool>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &FileOutcome) {
        self.files_seen += 1;
        match outcome {
            FileOutcome::Done => self.files_done += 1,
            FileOutcome::Skipped => self.files_skipped += 1,
            FileOutcome::WouldRun(_) => self.files_would_run += 1,
            FileOutcome::Failed(_) => self.errors += 1,
        }
    }

    pub fn format_summary(&self) -> String {
        let mut summary = format!(
            "Files: {} | Done: {} | Skipped: {} | Dry run: {} | Errors: {}",
            self.files_seen, self.files_done, self.files_skipped, self.files_would_run, self.errors
        );

        match self.fallback_synced {
            Some(true) => summary.push_str(" | Fallback sync: ok"),
            Some(false) => summary.push_str(" | Fallback sync: failed"),
            None => {}
        }

        summary
    }
}
