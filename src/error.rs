//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Categorie di errori:
//! - `Config`: parametri non validi o sorgente uguale alla destinazione (fatale)
//! - `TransformFailed`: il tool di conversione è uscito con stato non zero
//! - `ToolLaunch`: impossibile avviare un tool esterno
//! - `LinkUnsupported`: hard link non supportato tra le due radici (attiva il fallback)
//! - `SyncFailed`: il tool di sincronizzazione è uscito con stato non zero
//! - `Io`: tutti gli altri errori del filesystem (permessi, spazio, ...)
//!
//! Solo `Config` interrompe il processo. Gli altri errori riguardano un singolo
//! file e vengono riportati senza fermare la run.
//!
//! ## Esempio:
//! ```ignore
//! match std::fs::hard_link(&src, &dst) {
//!     Err(e) if is_link_unsupported(&e) => return Err(PhotocopyError::LinkUnsupported(e)),
//!     Err(e) => return Err(e.into()),
//!     Ok(()) => {}
//! }
//! ```

use std::io;

/// Custom error types for tree mirroring
#[derive(thiserror::Error, Debug)]
pub enum PhotocopyError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transform failed ({status}): {command}")]
    TransformFailed { command: String, status: String },

    #[error("Failed to launch {program}: {source}")]
    ToolLaunch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Hard link not supported between source and destination: {0}")]
    LinkUnsupported(#[source] io::Error),

    #[error("Sync failed ({status}): {command}")]
    SyncFailed { command: String, status: String },
}

/// Whether a failed hard link means linking cannot work between the two roots.
///
/// Only the cross-device condition (and filesystems without link support)
/// qualifies; permission or space problems stay ordinary per-file errors.
pub fn is_link_unsupported(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::CrossesDevices | io::ErrorKind::Unsupported
    )
}
