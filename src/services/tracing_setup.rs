//! Tracing subscriber setup
//!
//! The terminal UI owns stdout, so the binary logs to a file. Filtering
//! follows `RUST_LOG` with a DEBUG default.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber writing to `log_file_path`
pub fn init_global(log_file_path: &Path) -> anyhow::Result<()> {
    let log_file = File::create(log_file_path)
        .with_context(|| format!("Failed to create log file {}", log_file_path.display()))?;
    build_subscriber(log_file)
        .try_init()
        .context("A global subscriber is already installed")?;
    Ok(())
}

/// Subscriber shared by the binary and tests
pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into());

    let fmt_layer = fmt::layer().with_ansi(false).with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}
