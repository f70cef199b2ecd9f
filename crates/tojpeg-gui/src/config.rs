use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tojpeg_common::{default_output_dir, Background, Suffix};
use tojpeg_core::{ConversionOptions, Quality};

/// Settings remembered between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where converted files go
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// JPEG quality (1-100)
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Fill for transparent pixels, `#rrggbb`
    #[serde(default = "default_background")]
    pub background: String,

    /// Replace existing files instead of numbering new ones
    #[serde(default)]
    pub overwrite: bool,

    /// Number of parallel conversions (0 = auto-detect)
    #[serde(default)]
    pub workers: usize,

    /// Suffix for files without their own
    #[serde(default)]
    pub suffix: String,
}

fn default_quality() -> u8 {
    Quality::DEFAULT
}

fn default_background() -> String {
    Background::WHITE.to_hex()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            quality: default_quality(),
            background: default_background(),
            overwrite: false,
            workers: 0,
            suffix: String::new(),
        }
    }
}

impl AppConfig {
    /// Get config file path (platform config dir)
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = directories::ProjectDirs::from("", "", "tojpeg")
            .context("Failed to determine config directory")?
            .config_dir()
            .to_path_buf();

        fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).context("Failed to read config file")?;
            let config: AppConfig = toml::from_str(&content).context("Failed to parse config file")?;

            tracing::debug!("Loaded config from {:?}", path);
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Created default config at {:?}", path);
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reset to defaults
    pub fn reset() -> Result<()> {
        Self::default().save()
    }

    /// Background color, falling back to white when the stored value is garbage
    pub fn background_color(&self) -> Background {
        Background::from_hex(&self.background).unwrap_or_else(|e| {
            tracing::warn!("Ignoring configured background: {}", e);
            Background::WHITE
        })
    }

    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions::default()
            .with_quality(self.quality)
            .with_background(self.background_color())
            .with_overwrite(self.overwrite)
            .with_suffix(Suffix::sanitize(&self.suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.quality, 85);
        assert_eq!(config.background, "#ffffff");
        assert!(!config.overwrite);
        assert_eq!(config.workers, 0);
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "quality = 60\noverwrite = true\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.quality, 60);
        assert!(config.overwrite);
        assert_eq!(config.background, "#ffffff");
    }

    #[test]
    fn test_config_serialization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig {
            quality: 92,
            background: "#102030".into(),
            suffix: "_web".into(),
            workers: 4,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_conversion_options() {
        let config = AppConfig {
            quality: 250,
            background: "not a color".into(),
            suffix: "a b".into(),
            ..Default::default()
        };

        let options = config.conversion_options();
        assert_eq!(options.quality.value(), 100);
        assert_eq!(options.background, Background::WHITE);
        assert_eq!(options.suffix.as_str(), "ab");
    }
}
