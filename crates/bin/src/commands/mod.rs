pub mod bench;
pub mod burst;
pub mod config;
pub mod run;

use converge::{CrdtKind, HarnessConfig};

use crate::cli::ConfigSource;

/// Load the configuration file, or the built-in layout, and apply overrides.
pub fn load_config(source: &ConfigSource) -> converge::Result<HarnessConfig> {
    let mut config = match &source.config {
        Some(path) => HarnessConfig::load(path)?,
        None => {
            tracing::debug!("No config file given, using the local two-node layout");
            HarnessConfig::default()
        }
    };
    if let Some(timeout_ms) = source.timeout_ms {
        config.request_timeout_ms = timeout_ms;
    }
    Ok(config)
}

/// The requested kinds, or every configured group's kind when none were given.
pub fn selected_kinds(config: &HarnessConfig, requested: &[CrdtKind]) -> Vec<CrdtKind> {
    if requested.is_empty() {
        config.groups.iter().map(|g| g.kind).collect()
    } else {
        requested.to_vec()
    }
}
