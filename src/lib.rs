//! # Photocopy Library
//!
//! Rispecchia un albero di foto JPEG in una directory di destinazione,
//! tramite hard link oppure tramite un tool di trasformazione esterno.
//!
//! ## Architettura dei moduli:
//! - `config`: Opzioni della run, radici e validazione
//! - `error`: Tipi di errore custom
//! - `file_manager`: Walk dell'albero sorgente e filtro `.jpg`
//! - `image_processor`: Transform mode, un file alla volta
//! - `link_processor`: Link mode con fallback di sincronizzazione
//! - `optimizer`: Orchestratore, worker pool e report
//! - `platform`: Esecuzione dei tool esterni
//! - `progress`: Spinner, esiti e statistiche
//! - `json_output`: Eventi JSON per `--json`
//!
//! ## Utilizzo:
//! ```no_run
//! use photocopy::{Photocopier, Roots, RunOptions};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let roots = Roots::new("/photos", "/mirror")?;
//! let options = RunOptions { scale_percent: Some(30), ..Default::default() };
//! let stats = Photocopier::new(roots, options)?.run().await?;
//! println!("{}", stats.format_summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod link_processor;
pub mod optimizer;
pub mod platform;
pub mod progress;
pub mod utils;

pub use config::{Mode, Roots, RunOptions};
pub use error::PhotocopyError;
pub use file_manager::{FileManager, FileTask};
pub use optimizer::Photocopier;
pub use progress::RunStats;
