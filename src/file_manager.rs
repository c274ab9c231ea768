//! # File Management Module
//!
//! Questo modulo gestisce la discovery delle immagini nell'albero sorgente.
//!
//! ## Responsabilità:
//! - Visita ricorsiva della directory sorgente con `walkdir`
//! - Filtro dei nomi file: solo quelli che terminano in `.jpg` (case-insensitive),
//!   confrontando i byte del nome: anche i nomi non UTF-8 sono accettati
//! - Produzione lazy di `FileTask` (directory relativa + nome file)
//!
//! ## Note:
//! - L'ordine di visita non è garantito
//! - Le directory non vengono mai restituite come task
//! - I symlink seguono il comportamento di default di `walkdir`
//! - Le entry illeggibili vengono loggate e saltate
//! - La directory di destinazione, se sta dentro la sorgente, non viene visitata
//!
//! ## Esempio:
//! ```ignore
//! for task in FileManager::walk(Path::new("/photos")) {
//!     println!("{}", task.relative_path().display());
//! }
//! ```

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// One image found under the source root, consumed by exactly one executor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileTask {
    /// Directory of the file, relative to the source root (empty at the root)
    pub relative_dir: PathBuf,
    /// Base name of the file, kept as the OS gave it
    pub file_name: OsString,
}

impl FileTask {
    pub fn new(relative_dir: impl Into<PathBuf>, file_name: impl Into<OsString>) -> Self {
        Self {
            relative_dir: relative_dir.into(),
            file_name: file_name.into(),
        }
    }

    /// Path of the file relative to the source root
    pub fn relative_path(&self) -> PathBuf {
        self.relative_dir.join(&self.file_name)
    }

    /// Absolute (or root-relative) path of the source file
    pub fn source_path(&self, source_root: &Path) -> PathBuf {
        source_root.join(&self.relative_dir).join(&self.file_name)
    }
}

/// Discovers image files
pub struct FileManager;

impl FileManager {
    /// Lazily walk `root`, yielding a task for every JPEG file.
    pub fn walk(root: &Path) -> impl Iterator<Item = FileTask> {
        Self::walk_excluding(root, None)
    }

    /// Like [`FileManager::walk`], never descending into `excluded`.
    ///
    /// Used when the destination lies inside the source, so files the run
    /// writes are not picked up again by the same walk.
    pub fn walk_excluding(root: &Path, excluded: Option<&Path>) -> impl Iterator<Item = FileTask> {
        let root = root.to_path_buf();
        // Compared as absolute paths, so `.` and `./out` match `out`
        let excluded = excluded.and_then(|dir| std::path::absolute(dir).ok());

        WalkDir::new(&root)
            .into_iter()
            .filter_entry(move |entry| {
                let skip = entry.depth() > 0
                    && entry.file_type().is_dir()
                    && excluded.as_deref().is_some_and(|dir| {
                        std::path::absolute(entry.path()).is_ok_and(|path| path == dir)
                    });
                if skip {
                    debug!("Not descending into destination {}", entry.path().display());
                }
                !skip
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Cannot read entry while walking: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(move |entry| {
                let file_name = entry.file_name().to_os_string();
                if !Self::is_jpeg_name(&file_name) {
                    return None;
                }

                let relative_dir = entry
                    .path()
                    .parent()
                    .and_then(|parent| parent.strip_prefix(&root).ok())
                    .unwrap_or(Path::new(""))
                    .to_path_buf();

                Some(FileTask { relative_dir, file_name })
            })
    }

    /// Name ends with `.jpg` in any case and has at least one character before it.
    pub fn is_jpeg_name(name: impl AsRef<OsStr>) -> bool {
        const SUFFIX: &[u8] = b".jpg";

        let bytes = name.as_ref().as_encoded_bytes();
        bytes.len() > SUFFIX.len() && bytes[bytes.len() - SUFFIX.len()..].eq_ignore_ascii_case(SUFFIX)
    }
}
