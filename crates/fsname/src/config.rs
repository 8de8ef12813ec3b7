//! Name layer configuration

use crate::{EncodingMode, NameCodec};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Encoding settings read once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Narrow encoding: "utf8", "ansi" or "oem"
    pub encoding: EncodingMode,
    /// Overrides the host's ANSI codepage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_codepage: Option<u32>,
    /// Overrides the host's OEM codepage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oem_codepage: Option<u32>,
}

impl FsConfig {
    /// Load configuration from file
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::info!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "FsName", "FsName")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }

    /// Build the codec: host codepages unless overridden
    pub fn codec(&self) -> crate::Result<NameCodec> {
        let host = NameCodec::new(self.encoding);
        if self.system_codepage.is_none() && self.oem_codepage.is_none() {
            return Ok(host);
        }

        NameCodec::with_codepages(
            self.encoding,
            self.system_codepage.unwrap_or(host.system_codepage()),
            self.oem_codepage.unwrap_or(host.oem_codepage()),
        )
    }
}
