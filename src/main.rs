//! # Photocopy - Main Entry Point
//!
//! Punto di ingresso dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del logging con `tracing`
//! - Costruzione delle opzioni (file `--config` + flag CLI)
//! - Avvio del `Photocopier`
//!
//! ## Esempio di utilizzo:
//! ```bash
//! photocopy ~/Pictures /mnt/backup/Pictures --scale 50 --quality 80
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use photocopy::json_output::JsonMessage;
use photocopy::{Photocopier, Roots, RunOptions};

#[derive(Parser)]
#[command(name = "photocopy")]
#[command(about = "Mirror a tree of JPEG photos by hard-linking or by shrinking them")]
struct Args {
    /// Directory tree to read photos from
    source_dir: PathBuf,

    /// Directory tree to mirror into
    destination_dir: PathBuf,

    /// Replace files that already exist in the destination
    #[arg(short = 'w', long)]
    overwrite: bool,

    /// Report what would happen without touching anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Resize to about N megapixels
    #[arg(short, long, value_name = "N", num_args = 0..=1, default_missing_value = "4", conflicts_with = "scale")]
    resize: Option<u32>,

    /// Scale to N percent of the original size
    #[arg(short, long, value_name = "N", num_args = 0..=1, default_missing_value = "30")]
    scale: Option<u32>,

    /// JPEG quality (1-100)
    #[arg(short, long, value_name = "N")]
    quality: Option<u32>,

    /// Number of parallel transform workers
    #[arg(short = 'j', long, value_name = "N")]
    workers: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit one JSON object per event on stdout
    #[arg(long)]
    json: bool,

    /// JSON file with default options
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Program used to transform images
    #[arg(long, value_name = "PROG")]
    convert_tool: Option<String>,

    /// Program used when hard-linking is not possible
    #[arg(long, value_name = "PROG")]
    sync_tool: Option<String>,
}

impl Args {
    /// Flags given on the command line win over the loaded defaults
    fn apply_to(&self, mut options: RunOptions) -> RunOptions {
        options.overwrite |= self.overwrite;
        options.dry_run |= self.dry_run;
        options.json_output |= self.json;

        if self.scale.is_some() || self.resize.is_some() {
            options.scale_percent = self.scale;
            options.resize_megapixels = self.resize;
        }
        if let Some(quality) = self.quality {
            options.quality = Some(quality);
        }
        if let Some(workers) = self.workers {
            options.max_workers = workers;
        }
        if let Some(tool) = &self.convert_tool {
            options.transform_tool = tool.clone();
        }
        if let Some(tool) = &self.sync_tool {
            options.sync_tool = tool.clone();
        }

        options
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json)?;

    let result = run(&args).await;

    if let Err(e) = &result {
        if args.json {
            let details = e.chain().skip(1).map(|cause| cause.to_string()).collect::<Vec<_>>();
            let details = (!details.is_empty()).then(|| details.join(": "));
            JsonMessage::error(e.to_string(), details).emit();
        }
    }

    result
}

async fn run(args: &Args) -> Result<()> {
    let roots = Roots::new(&args.source_dir, &args.destination_dir)?;

    let defaults = match &args.config {
        Some(path) => RunOptions::from_file(path).await?,
        None => RunOptions::default(),
    };
    let options = args.apply_to(defaults);
    debug!("Options: {:?}", options);

    let photocopier = Photocopier::new(roots, options)?;
    photocopier.run().await?;

    Ok(())
}

/// `RUST_LOG` picks the filter unless `--verbose` forces DEBUG.
/// In JSON mode stdout carries only JSON, so logs go to stderr.
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let filter = log_filter(verbose, std::env::var("RUST_LOG").ok().as_deref());

    if json {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    EnvFilter::new(log_directives(verbose, rust_log))
}

fn log_directives(verbose: bool, rust_log: Option<&str>) -> String {
    match rust_log {
        _ if verbose => "debug".to_string(),
        Some(directives) if EnvFilter::try_new(directives).is_ok() => directives.to_string(),
        _ => "info".to_string(),
    }
}
