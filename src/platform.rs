//! # Platform-specific utilities
//!
//! Questo modulo centralizza la gestione dei comandi esterni: nomi
//! specifici per piattaforma, verifica della disponibilità dei tool e
//! l'esecuzione vera e propria tramite il trait `ToolRunner`.
//!
//! I comandi sono sempre un vettore di argomenti discreti passato
//! direttamente al processo, mai una stringa interpretata da una shell:
//! nomi file con spazi o caratteri speciali arrivano intatti al tool.

use crate::error::PhotocopyError;
use crate::utils::render_command;
use std::collections::HashMap;
use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::debug;

/// A program plus its discrete arguments. Arguments stay `OsString` so
/// paths reach the tool byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Human readable form, used in reports only. Lossy for non UTF-8 arguments.
    pub fn display(&self) -> String {
        render_command(&self.program, &self.args)
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// How a finished tool exited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub success: bool,
    pub description: String,
}

impl ToolStatus {
    pub fn success() -> Self {
        Self {
            success: true,
            description: "exit status: 0".to_string(),
        }
    }

    pub fn failure(description: impl Into<String>) -> Self {
        Self {
            success: false,
            description: description.into(),
        }
    }
}

/// Runs external tools. The production implementation spawns processes;
/// tests substitute a recorder.
pub trait ToolRunner: Send + Sync + 'static {
    fn run(&self, command: &ToolCommand) -> impl Future<Output = Result<ToolStatus, PhotocopyError>> + Send;
}

/// Spawns the tool with `tokio::process::Command` and waits for it
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    async fn run(&self, command: &ToolCommand) -> Result<ToolStatus, PhotocopyError> {
        let platform = PlatformCommands::instance();
        let program = platform.get_command(&command.program);
        debug!("Command: {:?} {:?}", program, command.args);

        let status = tokio::process::Command::new(program)
            .args(&command.args)
            .status()
            .await
            .map_err(|source| PhotocopyError::ToolLaunch {
                program: command.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(ToolStatus::success())
        } else {
            Ok(ToolStatus::failure(status.to_string()))
        }
    }
}

/// Platform-specific command manager
pub struct PlatformCommands {
    commands: HashMap<&'static str, &'static str>,
    which_command: &'static str,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let mut commands = HashMap::new();
        let which_command = if cfg!(windows) {
            // On Windows `convert` is the FAT-to-NTFS converter; use ImageMagick's front end
            commands.insert("convert", "magick.exe");
            commands.insert("magick", "magick.exe");
            commands.insert("rsync", "rsync.exe");
            "where"
        } else {
            commands.insert("convert", "convert");
            commands.insert("magick", "magick");
            commands.insert("rsync", "rsync");
            "which"
        };

        Self {
            commands,
            which_command,
        }
    }

    /// Get the platform-specific command name
    pub fn get_command<'a>(&self, base_name: &'a str) -> &'a str {
        self.commands.get(base_name).copied().unwrap_or(base_name)
    }

    /// Get the command used to check if a program exists
    pub fn which_command(&self) -> &str {
        self.which_command
    }

    /// Check if a command is available on the system
    pub async fn is_command_available(&self, base_name: &str) -> bool {
        let command_name = self.get_command(base_name);

        // Explicit paths are checked directly
        if command_name.contains(std::path::MAIN_SEPARATOR) {
            return PathBuf::from(command_name).is_file();
        }

        let result = tokio::process::Command::new(self.which_command)
            .arg(command_name)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await;

        match result {
            Ok(status) => status.success(),
            Err(_) => false,
        }
    }
}
