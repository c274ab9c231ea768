//! # Photocopier Main Orchestrator
//!
//! Orchestratore principale: sceglie la modalità e collega il walker
//! all'executor giusto.
//!
//! ## Flusso di esecuzione:
//! 1. **Validazione**: opzioni e radici controllate prima di qualsiasi lavoro
//! 2. **Dependency check**: avviso se il tool necessario non è nel PATH
//! 3. **Transform mode**: ogni file diventa un task nel `WorkerPool`; il walk
//!    si ferma finché non si libera uno slot
//! 4. **Link mode**: hard link sequenziali, con fallback `rsync` sull'intero
//!    albero al primo errore cross-device
//! 5. **Report**: statistiche finali su log o JSON
//!
//! Gli errori dei singoli file non interrompono mai la run.

use crate::{
    config::{Mode, RunOptions, Roots},
    file_manager::{FileManager, FileTask},
    image_processor::ImageProcessor,
    json_output::JsonMessage,
    link_processor::{LinkFn, LinkProcessor, LinkState},
    optimizer::{progress_tracker::ProgressTracker, worker_pool::WorkerPool},
    platform::{PlatformCommands, SystemRunner, ToolRunner},
    progress::RunStats,
};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Orchestratore principale
pub struct Photocopier<R = SystemRunner> {
    roots: Arc<Roots>,
    options: Arc<RunOptions>,
    runner: Arc<R>,
    tracker: ProgressTracker,
    link_fn: Option<LinkFn>,
}

impl Photocopier<SystemRunner> {
    /// Crea nuova istanza che esegue i tool di sistema
    pub fn new(roots: Roots, options: RunOptions) -> Result<Self> {
        Self::with_runner(roots, options, Arc::new(SystemRunner))
    }
}

impl<R: ToolRunner> Photocopier<R> {
    pub fn with_runner(roots: Roots, options: RunOptions, runner: Arc<R>) -> Result<Self> {
        options.validate()?;
        let tracker = ProgressTracker::new(&options);

        Ok(Self {
            roots: Arc::new(roots),
            options: Arc::new(options),
            runner,
            tracker,
            link_fn: None,
        })
    }

    /// Replace the hard-link function used in link mode
    pub fn with_link_fn(mut self, link_fn: LinkFn) -> Self {
        self.link_fn = Some(link_fn);
        self
    }

    /// Esegue la run completa e restituisce le statistiche
    pub async fn run(&self) -> Result<RunStats> {
        let start_time = Instant::now();
        let mode = self.options.mode();

        self.emit_start_message();
        self.log_configuration(mode);
        self.check_dependencies(mode).await;

        match mode {
            Mode::Transform => self.run_transform().await?,
            Mode::Link => self.run_link().await,
        }

        let stats = self.tracker.stats().await;
        self.tracker.finish(&stats.format_summary());
        self.print_final_stats(&stats, start_time.elapsed().as_secs_f64());

        Ok(stats)
    }

    /// Each file becomes one pool task; decisions are made inside the task
    async fn run_transform(&self) -> Result<()> {
        let processor = ImageProcessor::new(
            Arc::clone(&self.options),
            Arc::clone(&self.roots),
            Arc::clone(&self.runner),
            self.tracker.clone(),
        );
        let mut pool = WorkerPool::new(self.options.max_workers);

        for task in self.walk() {
            let processor = processor.clone();
            pool.spawn(async move {
                processor.execute(&task).await;
            })
            .await?;
        }

        let panicked = pool.join().await;
        if panicked > 0 {
            warn!("{} worker tasks ended abnormally", panicked);
        }

        Ok(())
    }

    async fn run_link(&self) {
        let mut processor = LinkProcessor::new(
            Arc::clone(&self.options),
            Arc::clone(&self.roots),
            Arc::clone(&self.runner),
            self.tracker.clone(),
        );
        if let Some(link_fn) = self.link_fn {
            processor = processor.with_link_fn(link_fn);
        }

        match processor.run(self.walk()).await {
            LinkState::Linking => debug!("All files handled by hard-linking"),
            LinkState::Fallback { synced } => debug!("Link pass replaced by sync (success: {})", synced),
        }
    }

    /// The destination may sit inside the source; never walk into it
    fn walk(&self) -> impl Iterator<Item = FileTask> {
        FileManager::walk_excluding(&self.roots.source, Some(&self.roots.destination))
    }

    fn emit_start_message(&self) {
        if self.options.json_output {
            JsonMessage::start(&self.roots.source, &self.roots.destination, &self.options).emit();
        }
        info!(
            "Mirroring {} into {}",
            self.roots.source.display(),
            self.roots.destination.display()
        );
    }

    fn log_configuration(&self, mode: Mode) {
        match mode {
            Mode::Transform => {
                if let Some(percent) = self.options.scale_percent {
                    info!("Mode: scale to {}%", percent);
                }
                if let Some(megapixels) = self.options.resize_megapixels {
                    info!("Mode: resize to {} Mpx", megapixels);
                }
                if let Some(quality) = self.options.quality {
                    info!("JPEG quality: {}", quality);
                }
                info!("Workers: {}", self.options.max_workers);
            }
            Mode::Link => info!("Mode: hard-link (fallback: {})", self.options.sync_tool),
        }

        if self.options.overwrite {
            info!("Overwrite mode: existing files will be replaced");
        }

        if self.options.dry_run {
            info!("Dry run mode: No files will be modified");
        }
    }

    /// Warn early when a tool the run cannot do without is missing
    async fn check_dependencies(&self, mode: Mode) {
        let platform = PlatformCommands::instance();

        if let Some(tool) = self.required_tool(mode) {
            if !platform.is_command_available(tool).await {
                warn!("{} not found in PATH", tool);
            }
        } else if mode == Mode::Link && !self.options.dry_run {
            // Only needed after a cross-device link failure
            let tool = &self.options.sync_tool;
            if !platform.is_command_available(tool).await {
                debug!("{} not found in PATH, cross-device fallback would fail", tool);
            }
        }
    }

    /// Tool every file of this run goes through, if any
    fn required_tool(&self, mode: Mode) -> Option<&str> {
        match mode {
            Mode::Transform if !self.options.dry_run => Some(self.options.transform_tool.as_str()),
            _ => None,
        }
    }

    fn print_final_stats(&self, stats: &RunStats, duration: f64) {
        if self.options.json_output {
            JsonMessage::complete(stats, duration).emit();
        }

        info!("=== Photocopy Complete ===");
        info!("Files seen: {}", stats.files_seen);
        info!("Files written: {}", stats.files_done);
        info!("Files skipped: {}", stats.files_skipped);
        if self.options.dry_run {
            info!("Files that would be written: {}", stats.files_would_run);
        }
        info!("Errors: {}", stats.errors);
        if let Some(synced) = stats.fallback_synced {
            info!("Fallback sync: {}", if synced { "completed" } else { "failed" });
        }
        info!("Duration: {:.2}s", duration);
    }
}
