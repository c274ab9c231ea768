//! # Optimizer Module
//!
//! Separa le responsabilità della run in sottomoduli:
//! - `media_optimizer`: Orchestratore principale (`Photocopier`)
//! - `worker_pool`: Pool limitato di task per la transform mode
//! - `progress_tracker`: Report unificato (log, JSON, spinner)
//! - `path_resolver`: Calcolo di path e azione di destinazione

pub mod media_optimizer;
pub mod path_resolver;
pub mod progress_tracker;
pub mod worker_pool;

pub use media_optimizer::Photocopier;
pub use path_resolver::PathResolver;
pub use progress_tracker::ProgressTracker;
pub use worker_pool::WorkerPool;
