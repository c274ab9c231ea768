//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON, una riga per evento,
//! per chi usa photocopy da un altro programma (`--json`).
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio della run (radici, modalità, opzioni)
//! - `directory`: Directory di destinazione creata (o da creare in dry run)
//! - `file_complete`: Fine elaborazione di un file con il suo esito
//! - `fallback`: Passaggio dal hard-link al tool di sincronizzazione
//! - `complete`: Fine della run con le statistiche finali
//! - `error`: Errore fatale
//!
//! I path sono convertiti in stringa in modo lossy: un nome non UTF-8 non
//! deve far sparire il messaggio.

use crate::config::{Mode, RunOptions};
use crate::progress::{FileOutcome, RunStats};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Start {
        source: String,
        destination: String,
        mode: Mode,
        config: JsonConfig,
    },

    Directory {
        path: String,
        dry_run: bool,
    },

    FileComplete {
        source: String,
        destination: String,
        status: String,
        detail: Option<String>,
    },

    Fallback {
        reason: String,
        command: String,
    },

    Complete {
        files_seen: usize,
        files_done: usize,
        files_skipped: usize,
        files_would_run: usize,
        errors: usize,
        fallback_synced: Option<bool>,
        duration_seconds: f64,
    },

    Error {
        message: String,
        details: Option<String>,
    },
}

/// Opzioni riportate nel messaggio `start`
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub overwrite: bool,
    pub dry_run: bool,
    pub scale_percent: Option<u32>,
    pub resize_megapixels: Option<u32>,
    pub quality: Option<u32>,
    pub max_workers: usize,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(source: &Path, destination: &Path, options: &RunOptions) -> Self {
        Self::Start {
            source: lossy(source),
            destination: lossy(destination),
            mode: options.mode(),
            config: JsonConfig::from(options),
        }
    }

    pub fn directory(path: &Path, dry_run: bool) -> Self {
        Self::Directory {
            path: lossy(path),
            dry_run,
        }
    }

    pub fn file_complete(source: &Path, destination: &Path, outcome: &FileOutcome) -> Self {
        Self::FileComplete {
            source: lossy(source),
            destination: lossy(destination),
            status: outcome.label().to_string(),
            detail: outcome.detail().map(str::to_string),
        }
    }

    pub fn fallback(reason: String, command: String) -> Self {
        Self::Fallback { reason, command }
    }

    pub fn complete(stats: &RunStats, duration_seconds: f64) -> Self {
        Self::Complete {
            files_seen: stats.files_seen,
            files_done: stats.files_done,
            files_skipped: stats.files_skipped,
            files_would_run: stats.files_would_run,
            errors: stats.errors,
            fallback_synced: stats.fallback_synced,
            duration_seconds,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

fn lossy(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl From<&RunOptions> for JsonConfig {
    fn from(options: &RunOptions) -> Self {
        Self {
            overwrite: options.overwrite,
            dry_run: options.dry_run,
            scale_percent: options.scale_percent,
            resize_megapixels: options.resize_megapixels,
            quality: options.quality,
            max_workers: options.max_workers,
        }
    }
}
