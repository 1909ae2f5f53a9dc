mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;
use streamvisor_common::ChannelDescriptor;

/// Parse a TOML config file without validating it.
///
/// Callers that layer command-line overrides on top validate the merged
/// result with [`validate_config`].
pub fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Load and validate configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let config = read_config(path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse config from default locations or return default config, unvalidated
pub fn read_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return read_config(path);
    }

    let default_paths = [
        "./streamvisor.toml",
        "~/.config/streamvisor/config.toml",
        "/etc/streamvisor/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return read_config(path);
        }
    }

    Ok(Config::default())
}

/// Load config from default locations or return default config, validated
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    let config = read_config_or_default(custom_path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.channels.count == 0 {
        anyhow::bail!("Channel count must be at least 1");
    }

    let last_port = u32::from(config.channels.base_port).saturating_add(config.channels.count - 1);
    if last_port > u32::from(u16::MAX) {
        anyhow::bail!(
            "{} channels starting at UDP port {} exceed port 65535",
            config.channels.count,
            config.channels.base_port
        );
    }

    if config.events.inbox_capacity == 0 {
        anyhow::bail!("Event inbox capacity must be at least 1");
    }

    if config.restart.first_delay_ms > config.restart.max_delay_ms {
        anyhow::bail!(
            "Restart first_delay_ms ({}) exceeds max_delay_ms ({})",
            config.restart.first_delay_ms,
            config.restart.max_delay_ms
        );
    }

    if !(config.restart.factor >= 1.0 && config.restart.factor.is_finite()) {
        anyhow::bail!("Restart factor must be a finite number >= 1.0");
    }

    if let Some(ref ffmpeg) = config.engine.ffmpeg_path {
        if !ffmpeg.exists() {
            tracing::warn!("Configured ffmpeg path does not exist: {:?}", ffmpeg);
        }
    }

    Ok(())
}

impl Config {
    /// Resolve one descriptor per configured channel.
    pub fn channel_descriptors(&self) -> Vec<ChannelDescriptor> {
        (0..self.channels.count)
            .map(|index| {
                ChannelDescriptor::new(
                    index,
                    self.channels.source_address(index),
                    &self.paths.output_dir,
                    &self.paths.log_dir,
                )
            })
            .collect()
    }
}
