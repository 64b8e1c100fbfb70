use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};
use crate::utils::path::{get_config_path, get_database_path};

/// Applikationsinställningar från `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    /// trace, debug, info, warn eller error
    pub log_level: String,
    pub export_directory: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: get_database_path(),
            log_level: "info".to_string(),
            export_directory: PathBuf::from("."),
        }
    }
}

impl Settings {
    /// Ladda från standardplatsen, faller tillbaka på standardvärden
    pub fn load() -> Self {
        let config_path = get_config_path();
        match Self::load_from(&config_path) {
            Ok(settings) => settings,
            Err(e) => {
                if config_path.exists() {
                    tracing::warn!("Kunde inte läsa {}: {}", config_path.display(), e);
                }
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::config(e.to_string()))
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| AppError::config(e.to_string()))?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn tracing_level(&self) -> tracing::Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let settings = Settings {
            database_path: PathBuf::from("/data/kyrka.db"),
            log_level: "debug".into(),
            export_directory: PathBuf::from("/data/export"),
        };
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let loaded: Settings = toml::from_str(r#"log_level = "warn""#).unwrap();
        assert_eq!(loaded.log_level, "warn");
        assert_eq!(loaded.database_path, get_database_path());
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let settings = Settings {
            log_level: "verbose".into(),
            ..Default::default()
        };
        assert_eq!(settings.tracing_level(), tracing::Level::INFO);
    }
}
