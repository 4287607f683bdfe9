//! Kite Runtime
//!
//! Usage:
//!   kite run script.js                 # Run a script until its timers are gone
//!   kite storage list [prefix]         # List the storage root
//!   kite storage pull <file>           # Stream a stored file as base64
//!   kite storage push <local> <file>   # Upload a local file
//!   kite storage remove <file>         # Delete a stored file
//!   kite storage stats                 # Free / total bytes of the root volume

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kite_script::{HostOptions, ScriptHost};
use kite_services::settings::Settings;
use kite_services::storage::{Command, CommandProcessor, Reply, StorageError, StreamReply};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "kite.toml";
const UPLOAD_READ_SIZE: usize = 4096;

#[derive(Parser)]
#[command(name = "kite", version, about = "Script host with timers and file storage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to ./kite.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the storage root directory
    #[arg(long, global = true)]
    root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a script and run its event loop
    Run {
        script: PathBuf,
    },

    /// Run one file transfer command against the storage root
    Storage {
        #[command(subcommand)]
        action: StorageAction,
    },
}

#[derive(Subcommand)]
enum StorageAction {
    List {
        #[arg(default_value = "")]
        prefix: String,
    },
    Pull {
        filename: String,
    },
    Push {
        /// Local file to upload
        local: PathBuf,
        /// Destination path inside the storage root
        filename: String,
    },
    Remove {
        filename: String,
    },
    Stats,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        settings.storage.root = root;
    }

    // stdout carries protocol output, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter)),
        )
        .with_writer(io::stderr)
        .init();

    tracing::debug!("Kite v{}", kite_core::VERSION);

    match cli.command {
        Commands::Run { script } => run_script(&settings, &script).map(|()| ExitCode::SUCCESS),
        Commands::Storage { action } => {
            let mut processor =
                kite_services::init_services(&settings).context("failed to open storage root")?;
            run_storage(&mut processor, action)
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if default.exists() {
                Settings::load(default).context("failed to load kite.toml")
            } else {
                Ok(Settings::default())
            }
        }
    }
}

fn run_script(settings: &Settings, script: &Path) -> Result<()> {
    let host = ScriptHost::with_options(HostOptions {
        drain_pending_jobs: settings.script.drain_pending_jobs,
    })
    .context("failed to start script host")?;

    tracing::info!(script = %script.display(), "running script");
    host.execute_file(script)
        .with_context(|| format!("script {} failed", script.display()))?;
    host.run().context("event loop failed")?;
    Ok(())
}

fn run_storage(processor: &mut CommandProcessor, action: StorageAction) -> Result<ExitCode> {
    let mut reply = StreamReply::new(io::stdout().lock(), io::stderr().lock());

    let result = match action {
        StorageAction::List { prefix } => processor.execute(Command::List { prefix }, &mut reply),
        StorageAction::Pull { filename } => processor.execute(Command::Pull { filename }, &mut reply),
        StorageAction::Remove { filename } => {
            processor.execute(Command::Remove { filename }, &mut reply)
        }
        StorageAction::Stats => processor.execute(Command::Stats, &mut reply),
        StorageAction::Push { local, filename } => {
            push_file(processor, &mut reply, &local, filename)?
        }
    };
    reply.flush().context("failed to flush output")?;

    // The processor already wrote any command failure to stderr.
    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            tracing::debug!(error = %err, "storage command failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Upload `local` one read at a time. Local read errors abort the upload
/// before commit, so the destination is left untouched.
fn push_file(
    processor: &mut CommandProcessor,
    reply: &mut dyn Reply,
    local: &Path,
    filename: String,
) -> Result<Result<(), StorageError>> {
    let mut file =
        File::open(local).with_context(|| format!("cannot open {}", local.display()))?;

    if let Err(err) = processor.execute(Command::PushStart, reply) {
        return Ok(Err(err));
    }
    let mut buf = vec![0u8; UPLOAD_READ_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("cannot read {}", local.display()))?;
        if n == 0 {
            break;
        }
        if let Err(err) = processor.execute(Command::PushChunk(buf[..n].to_vec()), reply) {
            return Ok(Err(err));
        }
    }
    Ok(processor.execute(Command::PushCommit { filename }, reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kite_services::storage::{BufferReply, StorageRoot};
    use std::fs;

    fn processor() -> (tempfile::TempDir, CommandProcessor) {
        let dir = tempfile::tempdir().unwrap();
        let root = StorageRoot::open(dir.path().join("root")).unwrap();
        (dir, CommandProcessor::new(root))
    }

    #[test]
    fn push_file_streams_multiple_reads() {
        let (dir, mut processor) = processor();
        let data: Vec<u8> = (0..3 * UPLOAD_READ_SIZE + 11).map(|i| (i % 253) as u8).collect();
        let local = dir.path().join("upload.bin");
        fs::write(&local, &data).unwrap();

        let mut reply = BufferReply::new();
        push_file(&mut processor, &mut reply, &local, "code/upload.bin".into())
            .unwrap()
            .unwrap();
        assert_eq!(reply.body, b"OK\n");
        assert_eq!(fs::read(dir.path().join("root/code/upload.bin")).unwrap(), data);
    }

    #[test]
    fn push_file_with_missing_local_file_leaves_storage_alone() {
        let (dir, mut processor) = processor();
        fs::write(dir.path().join("root/main.js"), b"old").unwrap();

        let mut reply = BufferReply::new();
        let missing = dir.path().join("missing.js");
        assert!(push_file(&mut processor, &mut reply, &missing, "main.js".into()).is_err());
        assert!(!processor.is_pushing());
        assert_eq!(fs::read(dir.path().join("root/main.js")).unwrap(), b"old");
    }

    #[test]
    fn failed_storage_command_is_an_exit_code_not_an_error() {
        let (_dir, mut processor) = processor();
        let action = StorageAction::Remove {
            filename: "not-there.js".into(),
        };
        assert!(run_storage(&mut processor, action).is_ok());
    }
}
