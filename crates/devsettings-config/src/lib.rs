//! Configuration management for devsettings
//!
//! TOML configuration with an environment overlay: where preferences are
//! persisted, how sink failures are treated, and how the built-in settings
//! table is adjusted for a particular device.

mod overrides;

pub use overrides::{
    CustomSetting, SettingKind, SettingOverride, SupportCheck, apply_override, build_catalog,
    load_custom_settings,
};

use devsettings_sync::backend::DEFAULT_BROADCAST_PROGRAM;
use devsettings_sync::{SettingDescriptor, SinkPolicy, catalog};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Standard configuration paths
pub const CONFIG_DIR: &str = "/etc/devsettings";
pub const USER_CONFIG_DIR: &str = "/data/misc/devsettings";

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "DEVSETTINGS_CONFIG";

/// Prefix for environment overrides, e.g. `DEVSETTINGS_GENERAL__STRICT_SINKS=true`
pub const ENV_PREFIX: &str = "DEVSETTINGS";

/// `DEVSETTINGS_<SECTION>__<KEY>`: one underscore after the prefix, two
/// between nested keys
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Daemon-wide options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Persistence store location
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Propagate sink write failures instead of logging them
    #[serde(default)]
    pub strict_sinks: bool,
    /// Activity-manager style program used for broadcasts
    #[serde(default = "default_broadcast_program")]
    pub broadcast_program: String,
}

fn default_store_path() -> PathBuf {
    Path::new(USER_CONFIG_DIR).join("preferences.toml")
}

fn default_broadcast_program() -> String {
    DEFAULT_BROADCAST_PROGRAM.to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            strict_sinks: false,
            broadcast_program: default_broadcast_program(),
        }
    }
}

/// Main devsettings configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevsettingsConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Adjustments to built-in settings, keyed by setting id
    #[serde(default)]
    pub overrides: BTreeMap<String, SettingOverride>,

    /// Additional settings
    #[serde(default)]
    pub settings: Vec<CustomSetting>,
}

impl DevsettingsConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load a file (if given) with `DEVSETTINGS_*` environment variables
    /// layered on top
    pub fn load_layered(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(
        path: Option<&Path>,
        env: config::Environment,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
        }

        let layered = builder.add_source(env).build()?;
        Ok(layered.try_deserialize()?)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        // Explicit path first, then user config, then system config
        if let Ok(explicit) = std::env::var(CONFIG_ENV) {
            return Self::load_layered(Some(Path::new(&explicit)));
        }

        let user_config = Path::new(USER_CONFIG_DIR).join("config.toml");
        if user_config.exists() {
            return Self::load_layered(Some(&user_config));
        }

        let system_config = Path::new(CONFIG_DIR).join("config.toml");
        if system_config.exists() {
            return Self::load_layered(Some(&system_config));
        }

        tracing::warn!("No configuration file found, using defaults");
        Self::load_layered(None)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    pub fn sink_policy(&self) -> SinkPolicy {
        if self.general.strict_sinks {
            SinkPolicy::Strict
        } else {
            SinkPolicy::Lenient
        }
    }

    /// Built-in table with overrides applied, followed by custom settings
    /// from this file and from `<config_dir>/settings.d`
    pub fn catalog(
        &self,
        config_dir: Option<&Path>,
    ) -> Result<Vec<SettingDescriptor>, ConfigError> {
        let mut custom = self.settings.clone();
        if let Some(dir) = config_dir {
            custom.extend(load_custom_settings(dir)?);
        }
        build_catalog(catalog::builtin(), &self.overrides, &custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devsettings_sync::{SettingValue, Support};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = DevsettingsConfig::default();
        assert_eq!(
            config.general.store_path,
            PathBuf::from("/data/misc/devsettings/preferences.toml")
        );
        assert!(!config.general.strict_sinks);
        assert_eq!(config.general.broadcast_program, "am");
        assert_eq!(config.sink_policy(), SinkPolicy::Lenient);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound(PathBuf::from("/etc/devsettings/config.toml"));
        assert!(format!("{}", err).contains("not found"));

        let err = ConfigError::Invalid("test error".to_string());
        assert!(format!("{}", err).contains("Invalid"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
[general]
store_path = "/tmp/prefs.toml"
strict_sinks = true

[overrides.vibrator_intensity]
path = "/sys/class/timed_output/vibrator/pwm_value"
default = "70"

[overrides.hspa]
enabled = false

[[settings]]
id = "led_fade"
category = "category_screen"
title = "LED fade"
kind = "bool"
default = "0"
path = "/sys/class/sec/led/led_fade"
"#;
        write!(temp_file, "{}", config_content).unwrap();

        let config = DevsettingsConfig::load(temp_file.path()).unwrap();
        assert_eq!(config.general.store_path, PathBuf::from("/tmp/prefs.toml"));
        assert_eq!(config.general.broadcast_program, "am");
        assert_eq!(config.sink_policy(), SinkPolicy::Strict);
        assert!(config.overrides["vibrator_intensity"].enabled);
        assert!(!config.overrides["hspa"].enabled);

        let table = config.catalog(None).unwrap();
        assert_eq!(table.len(), 9);
        let vibrator = table.iter().find(|d| d.id == "vibrator_intensity").unwrap();
        assert_eq!(vibrator.domain.default_value(), SettingValue::Int(70));
        let hspa = table.iter().find(|d| d.id == "hspa").unwrap();
        assert_eq!(hspa.support, Support::Never);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("config.toml");
        assert!(matches!(
            DevsettingsConfig::load(&missing),
            Err(ConfigError::NotFound(_))
        ));
        assert!(matches!(
            DevsettingsConfig::load_layered(Some(&missing)),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_layered_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[general]
broadcast_program = "/system/bin/am"

[overrides.dock_audio]
default = "1"
"#,
        )
        .unwrap();

        let config = DevsettingsConfig::load_layered(Some(&path)).unwrap();
        assert_eq!(config.general.broadcast_program, "/system/bin/am");
        assert_eq!(config.overrides["dock_audio"].default.as_deref(), Some("1"));
        assert!(config.overrides["dock_audio"].enabled);
    }

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(vars))
    }

    #[test]
    fn test_env_overlay() {
        let config = DevsettingsConfig::load_with_env(
            None,
            env(&[
                ("DEVSETTINGS_GENERAL__STRICT_SINKS", "true"),
                ("DEVSETTINGS_GENERAL__BROADCAST_PROGRAM", "/system/bin/am"),
            ]),
        )
        .unwrap();
        assert_eq!(config.sink_policy(), SinkPolicy::Strict);
        assert_eq!(config.general.broadcast_program, "/system/bin/am");
    }

    #[test]
    fn test_env_overlay_beats_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\nstrict_sinks = false\n").unwrap();

        let config = DevsettingsConfig::load_with_env(
            Some(&path),
            env(&[("DEVSETTINGS_GENERAL__STRICT_SINKS", "true")]),
        )
        .unwrap();
        assert!(config.general.strict_sinks);
    }

    #[test]
    fn test_env_overlay_ignores_unrelated_vars() {
        let config = DevsettingsConfig::load_with_env(
            None,
            env(&[
                ("DEVSETTINGS_CONFIG", "/etc/devsettings/config.toml"),
                ("DEVSETTINGS_MOCK_DEVICE", "desktop"),
                ("OTHER_GENERAL__STRICT_SINKS", "true"),
            ]),
        )
        .unwrap();
        assert_eq!(config, DevsettingsConfig::default());
    }

    #[test]
    fn test_save_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.toml");
        let mut config = DevsettingsConfig::default();
        config.general.strict_sinks = true;
        config
            .overrides
            .insert("mdnie_mode".to_string(), SettingOverride::default());

        config.save(&path).unwrap();

        let loaded = DevsettingsConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_catalog_reads_dropins() {
        let dir = TempDir::new().unwrap();
        let dropins = dir.path().join("settings.d");
        std::fs::create_dir_all(&dropins).unwrap();
        std::fs::write(
            dropins.join("led.toml"),
            r#"
id = "led_fade"
category = "category_screen"
kind = "bool"
default = "1"
path = "/sys/led"
"#,
        )
        .unwrap();

        let table = DevsettingsConfig::default().catalog(Some(dir.path())).unwrap();
        assert_eq!(table.last().map(|d| d.id.as_str()), Some("led_fade"));
    }

    #[test]
    fn test_constants() {
        assert_eq!(CONFIG_DIR, "/etc/devsettings");
        assert_eq!(USER_CONFIG_DIR, "/data/misc/devsettings");
    }
}
