use anyhow::{Context, Result};
use clap::ValueEnum;
use ota_depot_core::{OtaError, ServerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text logging for human readability
    Text,
    /// One JSON object per line for log aggregators
    Json,
}

pub fn load_config(path: &Path) -> Result<DepotConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

    let config: DepotConfig =
        toml::from_str(&contents).context("Failed to parse configuration file")?;

    Ok(config)
}

pub fn write_config(path: &Path, config: &DepotConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config).context("Failed to serialize configuration")?;

    std::fs::write(path, contents).context("Failed to write configuration file")?;

    Ok(())
}

/// Reject configurations the server could not run with
pub fn validate_config(config: &DepotConfig) -> ota_depot_core::Result<()> {
    let root = &config.server.firmware_root;
    match std::fs::metadata(root) {
        Ok(meta) => {
            if !meta.is_dir() {
                return Err(OtaError::InvalidConfig(format!(
                    "firmware_root {} is not a directory",
                    root.display()
                )));
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OtaError::InvalidConfig(format!(
                "firmware_root {} does not exist",
                root.display()
            )));
        }
        Err(e) => return Err(OtaError::Io(e)),
    }

    if let Err(e) = std::fs::read_dir(root) {
        return Err(OtaError::InvalidConfig(format!(
            "firmware_root is not readable: {}",
            e
        )));
    }

    if config.server.listen_addr.port() == 0 {
        return Err(OtaError::InvalidConfig(
            "listen_addr port must be non-zero".to_string(),
        ));
    }

    if let Some(ref log_file) = config.logging.file {
        let parent = log_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if !parent.is_dir() {
            return Err(OtaError::InvalidConfig(format!(
                "logging.file parent {} is not a directory",
                parent.display()
            )));
        }
        if log_file.file_name().is_none() {
            return Err(OtaError::InvalidConfig(
                "logging.file must include a file name".to_string(),
            ));
        }
    }

    Ok(())
}
