use anyhow::{anyhow, Context, Result};
use repodeck_core::ports::{LogConfig, LogFormat};
use std::fs::{self, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Where logs go when no log file is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Stderr,
    /// The terminal UI owns the screen
    Discard,
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init(config: &LogConfig, fallback: Fallback) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level: {}", config.level))?;

    let (writer, ansi) = match (&config.file, fallback) {
        (Some(path), _) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        (None, Fallback::Stderr) => (BoxMakeWriter::new(std::io::stderr), true),
        (None, Fallback::Discard) => (BoxMakeWriter::new(std::io::sink), false),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi);

    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| anyhow!("Failed to initialize logging: {err}"))
}
