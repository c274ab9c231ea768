//! # Link Processing Module
//!
//! Duplica l'albero senza trasformazioni: ogni immagine viene collegata con
//! un hard link, che non copia byte quando sorgente e destinazione stanno
//! sullo stesso volume.
//!
//! ## Macchina a stati:
//! - **Linking** (iniziale): un file alla volta, in sequenza
//! - **Fallback** (terminale): al primo hard link fallito perché non
//!   supportato tra le due radici (volumi diversi) il linking si ferma per
//!   tutta la run e viene lanciato un unico `rsync` sull'intero albero
//!
//! Gli altri errori (permessi, spazio su disco, ...) abbandonano solo il file
//! coinvolto e non attivano il fallback.
//!
//! ## Comando di fallback:
//! ```text
//! rsync -av [-n] --include */ --include *.jpg --include *.JPG --exclude * --prune-empty-dirs <src>/ <dst>
//! ```
//! La sincronizzazione copre sempre tutta la coppia di radici, compresi i
//! file già collegati prima del fallimento (rsync li trova identici).

use crate::{
    config::{RunOptions, Roots},
    error::{is_link_unsupported, PhotocopyError},
    file_manager::FileTask,
    optimizer::path_resolver::{Action, DestinationDecision, PathResolver},
    optimizer::progress_tracker::ProgressTracker,
    platform::{ToolCommand, ToolRunner},
    progress::FileOutcome,
    utils::to_string_vec,
};
use std::ffi::OsString;
use std::io;
use std::path::{Path, MAIN_SEPARATOR_STR};
use std::sync::Arc;

/// Function used to create a hard link
pub type LinkFn = fn(&Path, &Path) -> io::Result<()>;

/// Where the link pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Still (or finally) linking file by file
    Linking,
    /// Linking was abandoned; `synced` tells whether the sync tool succeeded
    Fallback { synced: bool },
}

/// Result of trying one file
enum LinkStep {
    Finished(FileOutcome),
    Unsupported(io::Error),
}

/// Hard-links files one by one with a whole-tree sync fallback
pub struct LinkProcessor<R> {
    options: Arc<RunOptions>,
    roots: Arc<Roots>,
    runner: Arc<R>,
    tracker: ProgressTracker,
    link: LinkFn,
}

impl<R: ToolRunner> LinkProcessor<R> {
    pub fn new(options: Arc<RunOptions>, roots: Arc<Roots>, runner: Arc<R>, tracker: ProgressTracker) -> Self {
        Self {
            options,
            roots,
            runner,
            tracker,
            link: |source, dest| std::fs::hard_link(source, dest),
        }
    }

    /// Replace the function creating hard links
    pub fn with_link_fn(mut self, link: LinkFn) -> Self {
        self.link = link;
        self
    }

    /// Process every task in order until linking turns out to be impossible.
    pub async fn run<I>(&self, tasks: I) -> LinkState
    where
        I: IntoIterator<Item = FileTask>,
    {
        for task in tasks {
            let source = task.source_path(&self.roots.source);
            let decision = PathResolver::plan(&task, &self.roots.destination, &self.options);

            match self.link_one(&source, &decision).await {
                LinkStep::Finished(outcome) => {
                    self.tracker.file_complete(&source, &decision.dest_file, &outcome).await;
                }
                LinkStep::Unsupported(e) => {
                    let reason = PhotocopyError::LinkUnsupported(e).to_string();
                    let synced = self.sync_all(&reason).await;
                    return LinkState::Fallback { synced };
                }
            }
        }

        LinkState::Linking
    }

    async fn link_one(&self, source: &Path, decision: &DestinationDecision) -> LinkStep {
        let dry_run = self.options.dry_run;

        if decision.needs_mkdir {
            if !dry_run {
                if let Err(e) = PathResolver::ensure_dir(&decision.dest_dir).await {
                    return LinkStep::Finished(FileOutcome::Failed(e.to_string()));
                }
            }
            self.tracker.directory(&decision.dest_dir, dry_run);
        }

        match decision.action {
            Action::Skip => {
                self.tracker.skipping(&decision.dest_file);
                return LinkStep::Finished(FileOutcome::Skipped);
            }
            Action::Overwrite => {
                self.tracker.overwriting(&decision.dest_file, dry_run);
                if !dry_run {
                    if let Err(e) = tokio::fs::remove_file(&decision.dest_file).await {
                        return LinkStep::Finished(FileOutcome::Failed(
                            PhotocopyError::Io(e).to_string(),
                        ));
                    }
                }
            }
            Action::Create => {}
        }

        if dry_run {
            return LinkStep::Finished(FileOutcome::WouldRun(format!(
                "link {} to {}",
                source.display(),
                decision.dest_file.display()
            )));
        }

        self.tracker.linking(source, &decision.dest_file);
        match (self.link)(source, &decision.dest_file) {
            Ok(()) => LinkStep::Finished(FileOutcome::Done),
            Err(e) if is_link_unsupported(&e) => LinkStep::Unsupported(e),
            Err(e) => LinkStep::Finished(FileOutcome::Failed(PhotocopyError::Io(e).to_string())),
        }
    }

    /// Run the sync tool once over the whole root pair
    async fn sync_all(&self, reason: &str) -> bool {
        let command = self.sync_command();
        self.tracker.fallback(reason, &command);

        let result = match self.runner.run(&command).await {
            Ok(status) if status.success => Ok(()),
            Ok(status) => Err(PhotocopyError::SyncFailed {
                command: command.display(),
                status: status.description,
            }
            .to_string()),
            Err(e) => Err(e.to_string()),
        };

        let synced = result.is_ok();
        self.tracker.fallback_finished(result).await;
        synced
    }

    /// Whole-tree sync command limited to JPEG files
    pub fn sync_command(&self) -> ToolCommand {
        let archive = if self.options.dry_run { "-anv" } else { "-av" };

        let mut args: Vec<OsString> = to_string_vec([
            archive,
            "--include",
            "*/",
            "--include",
            "*.jpg",
            "--include",
            "*.JPG",
            "--exclude",
            "*",
            "--prune-empty-dirs",
        ])
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(with_trailing_separator(&self.roots.source));
        args.push(self.roots.destination.as_os_str().to_os_string());

        ToolCommand::new(self.options.sync_tool.clone(), args)
    }
}

/// `src` → `src/`, so the sync copies the contents of the root rather than
/// the root directory itself
fn with_trailing_separator(path: &Path) -> OsString {
    let mut arg = path.as_os_str().to_os_string();
    let bytes = arg.as_encoded_bytes();
    if !bytes.ends_with(b"/") && !bytes.ends_with(MAIN_SEPARATOR_STR.as_bytes()) {
        arg.push(MAIN_SEPARATOR_STR);
    }
    arg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_manager::FileManager;
    use crate::platform::testing::RecordingRunner;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        source: PathBuf,
        dest: PathBuf,
    }

    fn fixture(files: &[&str]) -> Fixture {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        let dest = temp.path().join("dst");
        for file in files {
            let path = source.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, file.as_bytes()).unwrap();
        }
        fs::create_dir_all(&dest).unwrap();
        Fixture { _temp: temp, source, dest }
    }

    fn processor(fx: &Fixture, options: RunOptions, runner: Arc<RecordingRunner>) -> LinkProcessor<RecordingRunner> {
        let options = Arc::new(RunOptions { json_output: true, ..options });
        let roots = Arc::new(Roots::new(&fx.source, &fx.dest).unwrap());
        let tracker = ProgressTracker::new(&options);
        LinkProcessor::new(options, roots, runner, tracker)
    }

    fn sorted_tasks(root: &Path) -> Vec<FileTask> {
        let mut tasks: Vec<_> = FileManager::walk(root).collect();
        tasks.sort_by_key(|task| task.relative_path());
        tasks
    }

    #[tokio::test]
    async fn test_links_every_file() {
        let fx = fixture(&["a/x.jpg", "a/y.JPG", "b/z.png"]);
        let runner = Arc::new(RecordingRunner::new());
        let processor = processor(&fx, RunOptions::default(), runner.clone());

        let state = processor.run(sorted_tasks(&fx.source)).await;

        assert_eq!(state, LinkState::Linking);
        assert_eq!(fs::read(fx.dest.join("a/x.jpg")).unwrap(), b"a/x.jpg");
        assert_eq!(fs::read(fx.dest.join("a/y.JPG")).unwrap(), b"a/y.JPG");
        assert!(!fx.dest.join("b").exists());
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn test_skip_continues_with_next_file() {
        let fx = fixture(&["a/x.jpg", "a/y.JPG"]);
        fs::create_dir_all(fx.dest.join("a")).unwrap();
        fs::write(fx.dest.join("a/x.jpg"), b"old").unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let processor = processor(&fx, RunOptions::default(), runner.clone());

        processor.run(sorted_tasks(&fx.source)).await;

        assert_eq!(fs::read(fx.dest.join("a/x.jpg")).unwrap(), b"old");
        assert_eq!(fs::read(fx.dest.join("a/y.JPG")).unwrap(), b"a/y.JPG");
        let stats = processor.tracker.stats().await;
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.files_done, 1);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_existing_file() {
        let fx = fixture(&["a/x.jpg"]);
        fs::create_dir_all(fx.dest.join("a")).unwrap();
        fs::write(fx.dest.join("a/x.jpg"), b"old").unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let options = RunOptions {
            overwrite: true,
            ..Default::default()
        };
        let processor = processor(&fx, options, runner.clone());

        processor.run(sorted_tasks(&fx.source)).await;

        assert_eq!(fs::read(fx.dest.join("a/x.jpg")).unwrap(), b"a/x.jpg");
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let fx = fixture(&["a/x.jpg", "b/c/y.jpg"]);
        let runner = Arc::new(RecordingRunner::new());
        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        let processor = processor(&fx, options, runner.clone());

        let state = processor.run(sorted_tasks(&fx.source)).await;

        assert_eq!(state, LinkState::Linking);
        assert_eq!(fs::read_dir(&fx.dest).unwrap().count(), 0);
        assert!(runner.commands().is_empty());
        assert_eq!(processor.tracker.stats().await.files_would_run, 2);
    }

    static CROSS_DEVICE_ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

    fn cross_device_link(_: &Path, _: &Path) -> io::Result<()> {
        CROSS_DEVICE_ATTEMPTS.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::from(io::ErrorKind::CrossesDevices))
    }

    #[tokio::test]
    async fn test_cross_device_falls_back_to_single_sync() {
        let fx = fixture(&["a/x.jpg", "a/y.JPG", "b/w.jpg"]);
        let runner = Arc::new(RecordingRunner::new());
        let processor = processor(&fx, RunOptions::default(), runner.clone())
            .with_link_fn(cross_device_link);

        let state = processor.run(sorted_tasks(&fx.source)).await;

        assert_eq!(state, LinkState::Fallback { synced: true });
        assert_eq!(CROSS_DEVICE_ATTEMPTS.load(Ordering::SeqCst), 1);

        let commands = runner.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].program, "rsync");
        assert_eq!(commands[0].args[0], "-av");
        assert!(commands[0].args.contains(&OsString::from("--prune-empty-dirs")));
        let source_arg = &commands[0].args[commands[0].args.len() - 2];
        assert!(source_arg.as_encoded_bytes().ends_with(MAIN_SEPARATOR_STR.as_bytes()));
        assert_eq!(commands[0].args.last().unwrap(), fx.dest.as_os_str());

        // The failing file is covered by the sync, not reported as an error
        let stats = processor.tracker.stats().await;
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.fallback_synced, Some(true));
    }

    fn permission_denied_link(_: &Path, _: &Path) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::PermissionDenied))
    }

    #[tokio::test]
    async fn test_other_link_errors_do_not_fall_back() {
        let fx = fixture(&["a/x.jpg", "a/y.JPG"]);
        let runner = Arc::new(RecordingRunner::new());
        let processor = processor(&fx, RunOptions::default(), runner.clone())
            .with_link_fn(permission_denied_link);

        let state = processor.run(sorted_tasks(&fx.source)).await;

        assert_eq!(state, LinkState::Linking);
        assert!(runner.commands().is_empty());
        assert_eq!(processor.tracker.stats().await.errors, 2);
    }

    #[tokio::test]
    async fn test_failed_sync_is_reported() {
        let fx = fixture(&["a/x.jpg"]);
        let runner = Arc::new(RecordingRunner::new().failing_on("--prune-empty-dirs"));
        let processor = processor(&fx, RunOptions::default(), runner.clone())
            .with_link_fn(|_, _| Err(io::Error::from(io::ErrorKind::Unsupported)));

        let state = processor.run(sorted_tasks(&fx.source)).await;

        assert_eq!(state, LinkState::Fallback { synced: false });
        assert_eq!(processor.tracker.stats().await.fallback_synced, Some(false));
    }

    #[test]
    fn test_sync_command_dry_run_flag() {
        let fx = fixture(&[]);
        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        let processor = processor(&fx, options, Arc::new(RecordingRunner::new()));

        let command = processor.sync_command();
        assert_eq!(command.args[0], "-anv");
        assert_eq!(
            &command.args[1..10],
            &["--include", "*/", "--include", "*.jpg", "--include", "*.JPG", "--exclude", "*", "--prune-empty-dirs"]
        );
    }

    #[test]
    fn test_trailing_separator() {
        assert_eq!(
            with_trailing_separator(Path::new("photos")),
            OsString::from(format!("photos{}", MAIN_SEPARATOR_STR))
        );
        assert_eq!(with_trailing_separator(Path::new("photos/")), "photos/");
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_command_keeps_raw_root_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let source = temp.path().join(OsStr::from_bytes(b"caf\xff"));
        let dest = temp.path().join(OsStr::from_bytes(b"out\xff"));
        let fx = Fixture { _temp: temp, source, dest };
        let processor = processor(&fx, RunOptions::default(), Arc::new(RecordingRunner::new()));

        let command = processor.sync_command();
        let n = command.args.len();

        let mut expected_source = fx.source.as_os_str().as_bytes().to_vec();
        expected_source.push(b'/');
        assert_eq!(command.args[n - 2].as_bytes(), expected_source.as_slice());
        assert_eq!(command.args[n - 1].as_bytes(), fx.dest.as_os_str().as_bytes());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_links_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let fx = fixture(&["a/ok.jpg"]);
        let raw = OsStr::from_bytes(b"caf\xff.jpg");
        if fs::write(fx.source.join("a").join(raw), b"data").is_err() {
            // Some file systems refuse names that are not valid UTF-8
            return;
        }
        let runner = Arc::new(RecordingRunner::new());
        let processor = processor(&fx, RunOptions::default(), runner.clone());

        let state = processor.run(sorted_tasks(&fx.source)).await;

        assert_eq!(state, LinkState::Linking);
        assert_eq!(fs::read(fx.dest.join("a").join(raw)).unwrap(), b"data");
        assert_eq!(processor.tracker.stats().await.files_done, 2);
    }
}
