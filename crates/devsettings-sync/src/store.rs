//! Persistence store
//!
//! Durable key-value storage for setting values, keyed by setting id.

use crate::SettingValue;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Key-value store holding persisted setting values
pub trait PreferenceStore {
    /// Raw stored value, if any
    fn get(&self, key: &str) -> Option<SettingValue>;

    /// Persist a single key. Either the new value is durable or the store is
    /// left as it was.
    fn set(&mut self, key: &str, value: SettingValue) -> Result<(), StoreError>;

    /// Typed read: `default` when the key is absent or holds another kind.
    /// Callers that have a [`ValueDomain`](crate::ValueDomain) should go
    /// through [`ValueDomain::resolve`](crate::ValueDomain::resolve), which
    /// also enforces the domain.
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(SettingValue::Bool(b)) => b,
            _ => default,
        }
    }

    /// Typed read of a string; integers are rendered in decimal
    fn get_string(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(SettingValue::Choice(s)) => s,
            Some(SettingValue::Int(n)) => n.to_string(),
            _ => default.to_string(),
        }
    }

    /// Typed read of an integer; numeric strings are parsed
    fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(SettingValue::Int(n)) => n,
            Some(SettingValue::Choice(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }
}

/// In-memory store, for tests and dry runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    values: BTreeMap<String, SettingValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &BTreeMap<String, SettingValue> {
        &self.values
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: SettingValue) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// File-backed store: a flat TOML table of `id = value`
#[derive(Debug)]
pub struct TomlStore {
    path: PathBuf,
    values: BTreeMap<String, SettingValue>,
}

impl TomlStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            parse_table(&contents)?
        } else {
            tracing::debug!("No store at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn values(&self) -> &BTreeMap<String, SettingValue> {
        &self.values
    }

    fn persist(&self, values: &BTreeMap<String, SettingValue>) -> Result<(), StoreError> {
        let table: toml::Table = values
            .iter()
            .map(|(k, v)| (k.clone(), to_toml(v)))
            .collect();
        let contents = toml::to_string_pretty(&table)?;

        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        // Write-then-rename so readers never see a partial file
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, contents).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl PreferenceStore for TomlStore {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: SettingValue) -> Result<(), StoreError> {
        let mut next = self.values.clone();
        next.insert(key.to_string(), value);
        self.persist(&next)?;
        self.values = next;
        Ok(())
    }
}

fn parse_table(contents: &str) -> Result<BTreeMap<String, SettingValue>, StoreError> {
    let table: toml::Table = toml::from_str(contents)?;
    let mut values = BTreeMap::new();

    for (key, value) in table {
        match from_toml(&value) {
            Some(v) => {
                values.insert(key, v);
            }
            None => tracing::warn!("Ignoring stored '{}': unsupported value {}", key, value),
        }
    }

    Ok(values)
}

fn to_toml(value: &SettingValue) -> toml::Value {
    match value {
        SettingValue::Bool(b) => toml::Value::Boolean(*b),
        SettingValue::Int(n) => toml::Value::Integer(*n),
        SettingValue::Choice(s) => toml::Value::String(s.clone()),
    }
}

fn from_toml(value: &toml::Value) -> Option<SettingValue> {
    match value {
        toml::Value::Boolean(b) => Some(SettingValue::Bool(*b)),
        toml::Value::Integer(n) => Some(SettingValue::Int(*n)),
        toml::Value::String(s) => Some(SettingValue::Choice(s.clone())),
        _ => None,
    }
}
