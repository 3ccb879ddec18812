//! Settings registry
//!
//! [`DeviceSettings`] holds the static table of settings for a device and
//! routes restore and change events to the right [`SettingSync`].

use crate::backend::Backend;
use crate::screen::{Screen, ScreenCategory, ScreenEntry};
use crate::store::PreferenceStore;
use crate::sync::{SettingSync, SinkPolicy};
use crate::{Category, Result, SettingDescriptor, SettingValue, SyncError};
use std::collections::HashSet;

/// Outcome of restoring every setting at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<String>,
    /// Unsupported settings
    pub skipped: Vec<String>,
    /// Setting id and error message
    pub failed: Vec<(String, String)>,
}

impl RestoreReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Table of device settings bound to a hardware backend
pub struct DeviceSettings<B: Backend> {
    backend: B,
    categories: Vec<Category>,
    settings: Vec<SettingSync>,
}

impl<B: Backend> DeviceSettings<B> {
    /// Build the table, checking hardware support for every setting.
    /// Categories not listed in `categories` are appended in order of first use.
    pub fn new(
        backend: B,
        categories: Vec<Category>,
        descriptors: Vec<SettingDescriptor>,
        policy: SinkPolicy,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut categories = categories;
        let mut settings = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if !seen.insert(descriptor.id.clone()) {
                return Err(SyncError::DuplicateSetting(descriptor.id));
            }
            if !descriptor.domain.contains(&descriptor.domain.default_value()) {
                return Err(SyncError::InvalidDomain(format!(
                    "{}: default outside domain",
                    descriptor.id
                )));
            }
            if !categories.iter().any(|c| c.key == descriptor.category) {
                categories.push(Category::new(
                    descriptor.category.clone(),
                    descriptor.category.clone(),
                ));
            }
            settings.push(SettingSync::new(descriptor, &backend).with_policy(policy));
        }

        let supported = settings.iter().filter(|s| s.is_supported()).count();
        tracing::info!("{} of {} settings supported", supported, settings.len());

        Ok(Self {
            backend,
            categories,
            settings,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn settings(&self) -> &[SettingSync] {
        &self.settings
    }

    pub fn setting(&self, id: &str) -> Option<&SettingSync> {
        self.settings.iter().find(|s| s.id() == id)
    }

    fn lookup(&self, id: &str) -> Result<&SettingSync> {
        self.setting(id)
            .ok_or_else(|| SyncError::UnknownSetting(id.to_string()))
    }

    /// Mutable setting alongside the backend it writes to
    fn lookup_mut(&mut self, id: &str) -> Result<(&mut SettingSync, &B)> {
        let setting = self
            .settings
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| SyncError::UnknownSetting(id.to_string()))?;
        Ok((setting, &self.backend))
    }

    pub fn is_supported(&self, id: &str) -> Result<bool> {
        Ok(self.lookup(id)?.is_supported())
    }

    /// Current (defaulted) value of a setting
    pub fn value<S: PreferenceStore + ?Sized>(&self, store: &S, id: &str) -> Result<SettingValue> {
        Ok(self.lookup(id)?.current_value(store))
    }

    /// Restore a single setting; returns whether its sink was written
    pub fn restore<S: PreferenceStore + ?Sized>(&self, store: &S, id: &str) -> Result<bool> {
        self.lookup(id)?.restore(store, &self.backend)
    }

    /// Restore every setting in table order. Failures are collected, not
    /// fatal, so one bad node does not block the rest.
    pub fn restore_all<S: PreferenceStore + ?Sized>(&self, store: &S) -> RestoreReport {
        let mut report = RestoreReport::default();

        for setting in &self.settings {
            match setting.restore(store, &self.backend) {
                Ok(true) => report.restored.push(setting.id().to_string()),
                Ok(false) => report.skipped.push(setting.id().to_string()),
                Err(e) => {
                    tracing::error!("Failed to restore {}: {}", setting.id(), e);
                    report.failed.push((setting.id().to_string(), e.to_string()));
                }
            }
        }

        tracing::info!(
            "Restore complete: {} restored, {} skipped, {} failed",
            report.restored.len(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }

    pub fn on_change<S: PreferenceStore + ?Sized>(
        &mut self,
        store: &mut S,
        id: &str,
        value: SettingValue,
    ) -> Result<bool> {
        let (setting, backend) = self.lookup_mut(id)?;
        setting.on_change(store, backend, value)
    }

    pub fn on_change_str<S: PreferenceStore + ?Sized>(
        &mut self,
        store: &mut S,
        id: &str,
        raw: &str,
    ) -> Result<bool> {
        let (setting, backend) = self.lookup_mut(id)?;
        setting.on_change_str(store, backend, raw)
    }

    /// The active UI set: supported settings by category, empty categories
    /// removed.
    pub fn screen<S: PreferenceStore + ?Sized>(&self, store: &S) -> Screen {
        let categories = self
            .categories
            .iter()
            .filter_map(|category| {
                let entries: Vec<ScreenEntry> = self
                    .settings
                    .iter()
                    .filter(|s| s.is_supported() && s.descriptor().category == category.key)
                    .map(|s| ScreenEntry {
                        id: s.id().to_string(),
                        title: s.descriptor().title.clone(),
                        value: s.current_value(store),
                        domain: s.descriptor().domain.clone(),
                    })
                    .collect();

                if entries.is_empty() {
                    tracing::debug!("Hiding empty category {}", category.key);
                    None
                } else {
                    Some(ScreenCategory {
                        key: category.key.clone(),
                        title: category.title.clone(),
                        entries,
                    })
                }
            })
            .collect();

        Screen { categories }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, CATEGORY_DOCK, CATEGORY_HAPTIC, CATEGORY_SCREEN};
    use crate::mock::{MockBackend, MockProfile};
    use crate::store::MemoryStore;
    use crate::ValueDomain;

    fn galaxy(profile: MockProfile) -> DeviceSettings<MockBackend> {
        DeviceSettings::new(
            MockBackend::new_profile(profile),
            catalog::builtin_categories(),
            catalog::builtin(),
            SinkPolicy::Lenient,
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut descriptors = catalog::builtin();
        descriptors.push(descriptors[0].clone());
        let result = DeviceSettings::new(
            MockBackend::new(),
            catalog::builtin_categories(),
            descriptors,
            SinkPolicy::Lenient,
        );
        assert!(matches!(result, Err(SyncError::DuplicateSetting(id)) if id == "mdnie_mode"));
    }

    #[test]
    fn test_invalid_default_rejected() {
        let desc = SettingDescriptor::control_file(
            "broken",
            CATEGORY_SCREEN,
            "Broken",
            ValueDomain::Integer {
                min: 0,
                max: 10,
                default: 11,
            },
            "/sys/broken",
        );
        let result =
            DeviceSettings::new(MockBackend::new(), vec![], vec![desc], SinkPolicy::Lenient);
        assert!(matches!(result, Err(SyncError::InvalidDomain(_))));
    }

    #[test]
    fn test_screen_hides_unsupported_and_empty_categories() {
        let settings = galaxy(MockProfile::Desktop);
        let screen = settings.screen(&MemoryStore::new());

        // Only broadcast settings remain on a desktop
        let keys: Vec<_> = screen.categories.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["category_radio", "category_dock"]);
        assert!(screen.entry("mdnie_mode").is_none());
        assert!(screen.category(CATEGORY_HAPTIC).is_none());
        assert_eq!(
            screen.entry("dock_audio").map(|e| e.value.clone()),
            Some(SettingValue::Bool(false))
        );
    }

    #[test]
    fn test_screen_full_device() {
        let settings = galaxy(MockProfile::GalaxyS2);
        let mut store = MemoryStore::new();
        store.set("mdnie_mode", SettingValue::Choice("2".into())).unwrap();

        let screen = settings.screen(&store);
        assert_eq!(screen.categories.len(), 4);
        assert_eq!(screen.entries().count(), 8);
        assert_eq!(
            screen.entry("mdnie_mode").map(|e| e.value.clone()),
            Some(SettingValue::Choice("2".into()))
        );
        assert_eq!(screen.category(CATEGORY_SCREEN).map(|c| c.entries.len()), Some(5));
    }

    #[test]
    fn test_restore_all_reports_skipped() {
        let settings = galaxy(MockProfile::GalaxyS2NoMdnie);
        let report = settings.restore_all(&MemoryStore::new());

        assert!(report.is_success());
        assert_eq!(
            report.skipped,
            ["mdnie_mode", "mdnie_scenario", "mdnie_negative", "mdnie_outdoor"]
        );
        assert_eq!(
            report.restored,
            ["touchscreen_sensitivity", "vibrator_intensity", "hspa", "dock_audio"]
        );
        assert_eq!(
            settings.backend().control_value("/sys/vibrator/pwm_val").as_deref(),
            Some("50")
        );
    }

    #[test]
    fn test_restore_all_collects_strict_failures() {
        let backend = MockBackend::new_profile(MockProfile::GalaxyS2);
        backend.set_failing(true);
        let settings = DeviceSettings::new(
            backend,
            catalog::builtin_categories(),
            catalog::builtin(),
            SinkPolicy::Strict,
        )
        .unwrap();

        let report = settings.restore_all(&MemoryStore::new());
        assert!(!report.is_success());
        assert_eq!(report.failed.len(), 8);
        assert!(report.restored.is_empty());
    }

    #[test]
    fn test_unknown_setting() {
        let mut settings = galaxy(MockProfile::GalaxyS2);
        let mut store = MemoryStore::new();
        assert!(matches!(
            settings.on_change_str(&mut store, "nfc", "1"),
            Err(SyncError::UnknownSetting(_))
        ));
        assert!(matches!(
            settings.restore(&store, "nfc"),
            Err(SyncError::UnknownSetting(_))
        ));
        assert!(settings.is_supported("nfc").is_err());
    }

    #[test]
    fn test_uncategorised_setting_gets_own_category() {
        let desc = SettingDescriptor::broadcast(
            "led_notify",
            "category_led",
            "LED notifications",
            ValueDomain::boolean(true),
            "com.example.LED",
            "data",
        );
        let settings = DeviceSettings::new(
            MockBackend::new(),
            catalog::builtin_categories(),
            vec![desc],
            SinkPolicy::Lenient,
        )
        .unwrap();

        assert_eq!(settings.categories().len(), 5);
        let screen = settings.screen(&MemoryStore::new());
        assert_eq!(screen.categories.len(), 1);
        assert_eq!(screen.categories[0].key, "category_led");
        assert!(screen.category(CATEGORY_DOCK).is_none());
    }
}
