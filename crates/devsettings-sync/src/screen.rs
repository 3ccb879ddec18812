//! Active screen model
//!
//! The settings that are actually shown: supported settings grouped by
//! category, with empty categories dropped.

use crate::{SettingValue, ValueDomain};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenEntry {
    pub id: String,
    pub title: String,
    pub value: SettingValue,
    pub domain: ValueDomain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenCategory {
    pub key: String,
    pub title: String,
    pub entries: Vec<ScreenEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Screen {
    pub categories: Vec<ScreenCategory>,
}

impl Screen {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Look up a visible entry
    pub fn entry(&self, id: &str) -> Option<&ScreenEntry> {
        self.entries().find(|e| e.id == id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ScreenEntry> {
        self.categories.iter().flat_map(|c| c.entries.iter())
    }

    pub fn category(&self, key: &str) -> Option<&ScreenCategory> {
        self.categories.iter().find(|c| c.key == key)
    }
}
