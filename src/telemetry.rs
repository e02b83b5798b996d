use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};

/// Installs the global subscriber. Fails on an unparseable filter or if one is already set.
pub fn init(log: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&log.filter)
        .with_context(|| format!("RUST_LOG `{}` is not a valid filter", log.filter))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match log.format {
        LogFormat::Json => builder.with_target(false).json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed
        .map_err(|e| anyhow::anyhow!(e))
        .context("tracing subscriber already installed")
}
