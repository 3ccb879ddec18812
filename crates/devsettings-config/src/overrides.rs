//! Per-setting overrides and custom settings
//!
//! Lets a device tree adjust the built-in table: move a control node, change
//! a default, hide a setting, or declare settings the built-in table lacks.

use devsettings_sync::{SettingDescriptor, SettingValue, Support, ValueDomain};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::ConfigError;

/// Adjustments to a built-in setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingOverride {
    /// Control file path (control-file settings only)
    pub path: Option<PathBuf>,
    /// Default value, parsed in the setting's domain
    pub default: Option<String>,
    /// Disabled settings are treated as unsupported
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SettingOverride {
    fn default() -> Self {
        Self {
            path: None,
            default: None,
            enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_extra() -> String {
    "data".to_string()
}

/// Value kind of a custom setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    Bool,
    Choice,
    Integer,
}

/// Hardware check for a custom setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportCheck {
    Always,
    /// Control file present, writable or not
    Exists,
    Writable,
}

/// A setting declared in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSetting {
    pub id: String,
    pub category: String,
    /// Display title, defaults to the id
    pub title: Option<String>,
    pub kind: SettingKind,
    pub default: String,
    /// Allowed values for `choice`
    #[serde(default)]
    pub options: Vec<String>,
    /// Range for `integer`
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// Control file sink
    pub path: Option<PathBuf>,
    /// Broadcast sink
    pub action: Option<String>,
    #[serde(default = "default_extra")]
    pub extra: String,
    /// Defaults to `writable` for control files, `always` for broadcasts
    pub support: Option<SupportCheck>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CustomSetting {
    fn invalid(&self, reason: impl std::fmt::Display) -> ConfigError {
        ConfigError::Invalid(format!("setting {}: {}", self.id, reason))
    }

    fn domain(&self) -> Result<ValueDomain, ConfigError> {
        match self.kind {
            SettingKind::Bool => match ValueDomain::boolean(false).parse(&self.default) {
                Some(SettingValue::Bool(b)) => Ok(ValueDomain::boolean(b)),
                _ => Err(self.invalid(format!("'{}' is not a boolean", self.default))),
            },
            SettingKind::Choice => ValueDomain::choice(self.options.iter().cloned(), &self.default)
                .map_err(|e| self.invalid(e)),
            SettingKind::Integer => {
                let (Some(min), Some(max)) = (self.min, self.max) else {
                    return Err(self.invalid("integer settings need min and max"));
                };
                let default = self
                    .default
                    .trim()
                    .parse()
                    .map_err(|_| self.invalid(format!("'{}' is not an integer", self.default)))?;
                ValueDomain::integer(min, max, default).map_err(|e| self.invalid(e))
            }
        }
    }

    /// Convert into a descriptor
    pub fn to_descriptor(&self) -> Result<SettingDescriptor, ConfigError> {
        let domain = self.domain()?;
        let title = self.title.clone().unwrap_or_else(|| self.id.clone());

        let descriptor = match (&self.path, &self.action) {
            (Some(path), None) => SettingDescriptor::control_file(
                self.id.clone(),
                self.category.clone(),
                title,
                domain,
                path.clone(),
            ),
            (None, Some(action)) => SettingDescriptor::broadcast(
                self.id.clone(),
                self.category.clone(),
                title,
                domain,
                action.clone(),
                self.extra.clone(),
            ),
            _ => return Err(self.invalid("exactly one of path or action is required")),
        };

        if !self.enabled {
            return Ok(descriptor.with_support(Support::Never));
        }

        let support = match (self.support, &self.path) {
            (None, _) => return Ok(descriptor),
            (Some(SupportCheck::Always), _) => Support::Always,
            (Some(SupportCheck::Exists), Some(path)) => Support::PathExists(path.clone()),
            (Some(SupportCheck::Writable), Some(path)) => Support::Writable(path.clone()),
            (Some(_), None) => return Err(self.invalid("path checks need a control file")),
        };
        Ok(descriptor.with_support(support))
    }
}

/// Apply an override to a built-in descriptor
pub fn apply_override(
    descriptor: SettingDescriptor,
    over: &SettingOverride,
) -> Result<SettingDescriptor, ConfigError> {
    let mut descriptor = descriptor;

    if let Some(path) = &over.path {
        if descriptor.control_path().is_none() {
            return Err(ConfigError::Invalid(format!(
                "setting {}: path override on a broadcast setting",
                descriptor.id
            )));
        }
        descriptor = descriptor.with_control_path(path.clone());
    }

    if let Some(raw) = &over.default {
        let domain = with_default(&descriptor.domain, raw).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "setting {}: default '{}' is not a valid {} value",
                descriptor.id,
                raw,
                descriptor.domain.kind()
            ))
        })?;
        descriptor = descriptor.with_domain(domain);
    }

    if !over.enabled {
        descriptor = descriptor.with_support(Support::Never);
    }

    Ok(descriptor)
}

/// Same domain with a different default, if `raw` is in-domain
fn with_default(domain: &ValueDomain, raw: &str) -> Option<ValueDomain> {
    match (domain, domain.parse(raw)?) {
        (ValueDomain::Boolean { .. }, SettingValue::Bool(b)) => {
            Some(ValueDomain::Boolean { default: b })
        }
        (ValueDomain::Choice { options, .. }, SettingValue::Choice(s)) => {
            Some(ValueDomain::Choice {
                options: options.clone(),
                default: s,
            })
        }
        (ValueDomain::Integer { min, max, .. }, SettingValue::Int(n)) => {
            Some(ValueDomain::Integer {
                min: *min,
                max: *max,
                default: n,
            })
        }
        _ => None,
    }
}

/// Apply overrides to the built-in table and append custom settings
pub fn build_catalog(
    builtin: Vec<SettingDescriptor>,
    overrides: &BTreeMap<String, SettingOverride>,
    custom: &[CustomSetting],
) -> Result<Vec<SettingDescriptor>, ConfigError> {
    if let Some(unknown) = overrides
        .keys()
        .find(|id| !builtin.iter().any(|d| &d.id == *id))
    {
        return Err(ConfigError::Invalid(format!(
            "override for unknown setting {}",
            unknown
        )));
    }

    let mut catalog = builtin
        .into_iter()
        .map(|d| match overrides.get(&d.id) {
            Some(over) => apply_override(d, over),
            None => Ok(d),
        })
        .collect::<Result<Vec<_>, _>>()?;

    for setting in custom {
        if catalog.iter().any(|d| d.id == setting.id) {
            return Err(ConfigError::Invalid(format!(
                "setting {} is already defined",
                setting.id
            )));
        }
        catalog.push(setting.to_descriptor()?);
    }

    Ok(catalog)
}

/// Load drop-in custom settings from `<config_dir>/settings.d/*.toml`
pub fn load_custom_settings(config_dir: &Path) -> Result<Vec<CustomSetting>, ConfigError> {
    let dropin_dir = config_dir.join("settings.d");
    let mut settings = Vec::new();

    if !dropin_dir.exists() {
        return Ok(settings);
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(&dropin_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "toml") {
            paths.push(path);
        }
    }
    // Directory order is unspecified; keep the table stable
    paths.sort();

    for path in paths {
        let contents = std::fs::read_to_string(&path)?;
        let setting: CustomSetting = toml::from_str(&contents)?;
        tracing::debug!("Loaded custom setting {} from {}", setting.id, path.display());
        settings.push(setting);
    }

    Ok(settings)
}
