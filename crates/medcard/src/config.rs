//! Configuration management for medcard.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveOptions, ARCHIVE_PREFIX};
use crate::catalogue::DEFAULT_BASE_URL;
use crate::error::{Error, Result};
use crate::url::URL_PLACEHOLDER;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "medcard";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "catalogue.db";

/// Default companion command for writing a URL to an NFC tag.
const DEFAULT_NFC_COMMAND: &str = "python3 write_tag.py \"{url}\"";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `MEDCARD_`)
/// 2. TOML config file at `~/.config/medcard/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Public viewer configuration.
    pub site: SiteConfig,
    /// Export configuration.
    pub export: ExportConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the catalogue database.
    /// Defaults to `~/.local/share/medcard/catalogue.db`
    pub database_path: Option<PathBuf>,
}

/// Public viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL used until one is set with `medcard base-url set`.
    pub default_base_url: String,
    /// Embed each record's public URL in exported JSON as `url`.
    pub embed_url: bool,
    /// Command template shown by `share`; `{url}` is replaced by the public URL.
    pub nfc_command: String,
}

/// Export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Folder inside the archive.
    pub folder: String,
    /// Directory archives and JSON files are written to.
    pub output_dir: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            default_base_url: DEFAULT_BASE_URL.to_string(),
            embed_url: true,
            nfc_command: DEFAULT_NFC_COMMAND.to_string(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            folder: ARCHIVE_PREFIX.to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        // Defaults, then the TOML file, then MEDCARD_ environment variables
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("MEDCARD_").split("__"));

        let config: Config = figment.extract()?;

        // Validate the merged result
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.site.default_base_url.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "site.default_base_url cannot be empty".to_string(),
            });
        }

        if !self.site.nfc_command.contains(URL_PLACEHOLDER) {
            return Err(Error::ConfigValidation {
                message: format!("site.nfc_command must contain {URL_PLACEHOLDER}"),
            });
        }

        // The archive folder becomes a single path component
        let folder = self.export.folder.trim_matches('/');
        if folder.is_empty() || folder.contains(['/', '\\']) || folder == ".." {
            return Err(Error::ConfigValidation {
                message: format!(
                    "export.folder must be a single directory name, got '{}'",
                    self.export.folder
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Archive layout derived from this configuration.
    #[must_use]
    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions {
            folder: self.export.folder.clone(),
            embed_url: self.site.embed_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert_eq!(config.site.default_base_url, DEFAULT_BASE_URL);
        assert!(config.site.embed_url);
        assert_eq!(config.export.folder, "medical-cards");
        assert_eq!(config.export.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_base_url() {
        let mut config = Config::default();
        config.site.default_base_url = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("default_base_url"));
    }

    #[test]
    fn test_validate_nfc_command_without_placeholder() {
        let mut config = Config::default();
        config.site.nfc_command = "write-tag".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("nfc_command"));
    }

    #[test]
    fn test_validate_folder_with_separator() {
        for folder in ["a/b", "", "/", "..", "a\\b"] {
            let mut config = Config::default();
            config.export.folder = folder.to_string();
            assert!(config.validate().is_err(), "accepted folder {folder:?}");
        }
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("catalogue.db"));
        assert!(path.to_string_lossy().contains("medcard"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_archive_options() {
        let mut config = Config::default();
        config.site.embed_url = false;
        config.export.folder = "cards".to_string();

        let options = config.archive_options();
        assert_eq!(options.folder, "cards");
        assert!(!options.embed_url);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("medcard"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [site]
                default_base_url = "https://cards.test"
                embed_url = false

                [export]
                folder = "fiches"
                "#,
            )?;

            let config = Config::load_from(Some(PathBuf::from("config.toml")))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.site.default_base_url, "https://cards.test");
            assert!(!config.site.embed_url);
            assert_eq!(config.export.folder, "fiches");
            assert_eq!(config.site.nfc_command, DEFAULT_NFC_COMMAND);
            Ok(())
        });
    }

    #[test]
    fn test_load_invalid_toml_value_fails_validation() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[site]\nnfc_command = \"no placeholder\"\n")?;

            let err = Config::load_from(Some(PathBuf::from("config.toml"))).unwrap_err();
            assert!(err.to_string().contains("nfc_command"));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("MEDCARD_SITE__EMBED_URL", "false");
            jail.set_env("MEDCARD_EXPORT__FOLDER", "cartes");
            jail.set_env("MEDCARD_STORAGE__DATABASE_PATH", "/tmp/cards.db");

            let config = Config::load_from(Some(PathBuf::from("missing.toml")))
                .map_err(|e| e.to_string())?;

            assert!(!config.site.embed_url);
            assert_eq!(config.export.folder, "cartes");
            assert_eq!(config.database_path(), PathBuf::from("/tmp/cards.db"));
            assert_eq!(config.site.default_base_url, DEFAULT_BASE_URL);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [site]
                default_base_url = "https://from-file.test"
                embed_url = true
                "#,
            )?;
            jail.set_env("MEDCARD_SITE__DEFAULT_BASE_URL", "https://from-env.test");

            let config = Config::load_from(Some(PathBuf::from("config.toml")))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.site.default_base_url, "https://from-env.test");
            assert!(config.site.embed_url);
            Ok(())
        });
    }

    #[test]
    fn test_site_config_deserialize() {
        let json = r#"{"embed_url": false}"#;
        let site: SiteConfig = serde_json::from_str(json).unwrap();
        assert!(!site.embed_url);
        assert_eq!(site.default_base_url, DEFAULT_BASE_URL);
    }
}
