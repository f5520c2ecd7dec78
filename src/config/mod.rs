mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./passforge.toml",
        "~/.config/passforge/config.toml",
        "/etc/passforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.encoder.program.as_os_str().is_empty() {
        anyhow::bail!("Encoder program cannot be empty");
    }

    if config.encoder.job_timeout_secs == 0 {
        anyhow::bail!("Encoder job timeout cannot be 0");
    }

    if config.segmentation.segment_seconds == 0 {
        anyhow::bail!("Segment duration cannot be 0");
    }

    if config.fetch.connect_timeout_secs == 0 {
        tracing::warn!("Fetch connect timeout is 0; downloads will fail immediately");
    }

    Ok(())
}
