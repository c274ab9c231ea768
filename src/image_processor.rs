//! # Image Processing Module
//!
//! Questo modulo gestisce la trasformazione di una singola immagine tramite
//! un tool esterno (ImageMagick `convert` di default). Nessuna decodifica
//! avviene in-process.
//!
//! ## Pipeline per file
//!
//! 1. **Decisione**: calcolata al momento dell'esecuzione (`PathResolver::plan`)
//! 2. **Skip**: se il file esiste e non c'è `--overwrite`, nessuna modifica
//! 3. **Directory**: creazione ricorsiva e tollerante alle race
//! 4. **Comando**: costruito come vettore di argomenti
//! 5. **Esecuzione**: in dry run solo report, altrimenti invocazione del tool
//!
//! ## Argomenti del tool
//!
//! | Opzione             | Argomento            |
//! |---------------------|----------------------|
//! | `scale_percent = N` | `-resize N%`         |
//! | `resize_megapixels` | `-geometry @N000000` |
//! | `quality = N`       | `-quality N`         |
//!
//! seguiti da file sorgente e file di destinazione.
//!
//! ## Gestione errori
//!
//! Un'uscita non zero o un errore di avvio diventano `FileOutcome::Failed`
//! per quel solo file: gli altri task continuano.

use crate::{
    args,
    config::{RunOptions, Roots},
    error::PhotocopyError,
    file_manager::FileTask,
    optimizer::path_resolver::{Action, DestinationDecision, PathResolver},
    optimizer::progress_tracker::ProgressTracker,
    platform::{ToolCommand, ToolRunner},
    progress::FileOutcome,
};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Runs the transform tool for one file at a time
pub struct ImageProcessor<R> {
    options: Arc<RunOptions>,
    roots: Arc<Roots>,
    runner: Arc<R>,
    tracker: ProgressTracker,
}

impl<R> Clone for ImageProcessor<R> {
    fn clone(&self) -> Self {
        Self {
            options: Arc::clone(&self.options),
            roots: Arc::clone(&self.roots),
            runner: Arc::clone(&self.runner),
            tracker: self.tracker.clone(),
        }
    }
}

impl<R: ToolRunner> ImageProcessor<R> {
    pub fn new(options: Arc<RunOptions>, roots: Arc<Roots>, runner: Arc<R>, tracker: ProgressTracker) -> Self {
        Self {
            options,
            roots,
            runner,
            tracker,
        }
    }

    /// Plan and process one task, reporting its outcome
    pub async fn execute(&self, task: &FileTask) -> FileOutcome {
        let decision = PathResolver::plan(task, &self.roots.destination, &self.options);
        let outcome = self.execute_with(task, &decision).await;

        let source = task.source_path(&self.roots.source);
        self.tracker.file_complete(&source, &decision.dest_file, &outcome).await;
        outcome
    }

    /// Process one task against an already computed decision
    pub async fn execute_with(&self, task: &FileTask, decision: &DestinationDecision) -> FileOutcome {
        if decision.action == Action::Skip {
            self.tracker.skipping(&decision.dest_file);
            return FileOutcome::Skipped;
        }

        let dry_run = self.options.dry_run;

        if decision.needs_mkdir {
            if !dry_run {
                if let Err(e) = PathResolver::ensure_dir(&decision.dest_dir).await {
                    return FileOutcome::Failed(e.to_string());
                }
            }
            self.tracker.directory(&decision.dest_dir, dry_run);
        }

        if decision.action == Action::Overwrite {
            self.tracker.overwriting(&decision.dest_file, dry_run);
        }

        let source = task.source_path(&self.roots.source);
        let command = self.build_command(&source, &decision.dest_file);

        if dry_run {
            return FileOutcome::WouldRun(format!("call {}", command));
        }

        self.tracker.invoking(&command);
        match self.runner.run(&command).await {
            Ok(status) if status.success => FileOutcome::Done,
            Ok(status) => FileOutcome::Failed(
                PhotocopyError::TransformFailed {
                    command: command.display(),
                    status: status.description,
                }
                .to_string(),
            ),
            Err(e) => FileOutcome::Failed(e.to_string()),
        }
    }

    /// Full transform command for one source/destination pair
    pub fn build_command(&self, source: &Path, dest_file: &Path) -> ToolCommand {
        let mut args: Vec<OsString> = Self::transform_args(&self.options)
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(source.as_os_str().to_os_string());
        args.push(dest_file.as_os_str().to_os_string());

        let command = ToolCommand::new(self.options.transform_tool.clone(), args);
        debug!("Transform command: {:?}", command);
        command
    }

    /// Flags derived from the options; absent options contribute nothing
    pub fn transform_args(options: &RunOptions) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(percent) = options.scale_percent {
            args.extend(args!["-resize", format!("{}%", percent)]);
        }

        if let Some(megapixels) = options.resize_megapixels {
            args.extend(args!["-geometry", format!("@{}000000", megapixels)]);
        }

        if let Some(quality) = options.quality {
            args.extend(args!["-quality", quality]);
        }

        args
    }
}
