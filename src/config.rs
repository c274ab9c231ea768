//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `RunOptions`, la configurazione immutabile letta da ogni executor
//! - Definisce `Roots`, la coppia sorgente/destinazione
//! - Valida i parametri prima che parta qualsiasi lavoro
//! - Supporta caricamento/salvataggio delle opzioni da/verso file JSON
//!
//! ## Parametri di configurazione:
//! - `overwrite`: Sovrascrive i file già presenti in destinazione (default: false)
//! - `dry_run`: Riporta le azioni senza modificare nulla (default: false)
//! - `scale_percent`: Scala le immagini alla percentuale indicata (default: None)
//! - `resize_megapixels`: Ridimensiona a N megapixel (default: None)
//! - `quality`: Qualità JPEG dell'output (default: None)
//! - `max_workers`: Numero massimo di conversioni concorrenti (default: 8)
//! - `transform_tool`: Tool di conversione (default: "convert")
//! - `sync_tool`: Tool di sincronizzazione per il fallback (default: "rsync")
//!
//! ## Modalità:
//! Se almeno una tra scale/resize/quality è impostata si lavora in
//! `Mode::Transform`, altrimenti in `Mode::Link`.
//!
//! ## Esempio:
//! ```ignore
//! let options = RunOptions {
//!     scale_percent: Some(50),
//!     ..Default::default()
//! };
//! options.validate()?;
//! ```

use crate::error::PhotocopyError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of concurrent transform invocations
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Megapixels used when `--resize` is given without a value
pub const DEFAULT_RESIZE_MEGAPIXELS: u32 = 4;

/// Percentage used when `--scale` is given without a value
pub const DEFAULT_SCALE_PERCENT: u32 = 30;

/// How files reach the destination tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Every file goes through the external transform tool
    Transform,
    /// Hard-link every file, falling back to a whole-tree sync
    Link,
}

/// Options shared read-only by every component for the whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Replace files that already exist in the destination
    pub overwrite: bool,
    /// Report what would happen without touching the filesystem
    pub dry_run: bool,
    /// Scale images to this percentage
    pub scale_percent: Option<u32>,
    /// Resize images to this many megapixels
    pub resize_megapixels: Option<u32>,
    /// JPEG quality of the output (1-100)
    pub quality: Option<u32>,
    /// Upper bound of concurrently running transforms
    pub max_workers: usize,
    /// Image conversion program
    pub transform_tool: String,
    /// Directory sync program used when hard-linking is impossible
    pub sync_tool: String,
    /// Report as JSON lines instead of log lines
    pub json_output: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            dry_run: false,
            scale_percent: None,
            resize_megapixels: None,
            quality: None,
            max_workers: DEFAULT_MAX_WORKERS,
            transform_tool: "convert".to_string(),
            sync_tool: "rsync".to_string(),
            json_output: false,
        }
    }
}

impl RunOptions {
    /// Transform mode as soon as any image option is requested
    pub fn mode(&self) -> Mode {
        if self.scale_percent.is_some() || self.resize_megapixels.is_some() || self.quality.is_some() {
            Mode::Transform
        } else {
            Mode::Link
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), PhotocopyError> {
        if self.scale_percent.is_some() && self.resize_megapixels.is_some() {
            return Err(PhotocopyError::Config(
                "scale and resize cannot be used together".to_string(),
            ));
        }

        if self.scale_percent == Some(0) {
            return Err(PhotocopyError::Config("Scale must be greater than 0".to_string()));
        }

        if self.resize_megapixels == Some(0) {
            return Err(PhotocopyError::Config("Resize must be greater than 0 Mpx".to_string()));
        }

        if let Some(quality) = self.quality {
            if quality == 0 || quality > 100 {
                return Err(PhotocopyError::Config("Quality must be between 1 and 100".to_string()));
            }
        }

        if self.max_workers == 0 {
            return Err(PhotocopyError::Config(
                "Number of workers must be greater than 0".to_string(),
            ));
        }

        if self.transform_tool.is_empty() || self.sync_tool.is_empty() {
            return Err(PhotocopyError::Config("Tool names cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Load options from file, defaults when the file does not exist
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let options: RunOptions = serde_json::from_str(&content)?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Source and destination roots of a run
#[derive(Debug, Clone)]
pub struct Roots {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl Roots {
    /// Refuses identical roots. The check compares the arguments as given,
    /// so `photos` and `./photos` are considered different.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Result<Self, PhotocopyError> {
        let source = source.into();
        let destination = destination.into();

        if source.as_os_str() == destination.as_os_str() {
            return Err(PhotocopyError::Config(
                "You cannot give the same folder for source and destination".to_string(),
            ));
        }

        Ok(Self { source, destination })
    }
}
