//! Hardware setting synchronizer
//!
//! Keeps device-specific hardware settings (display color mode, haptic
//! intensity, radio protocol, dock audio) in sync between a persistent
//! preference store and the driver interfaces that apply them.
//!
//! Every setting follows the same pattern: check that the hardware is there,
//! restore the persisted value at boot, and on change persist the new value
//! and push it to a sysfs control file or a system broadcast.
//!
//! # Example
//!
//! ```
//! use devsettings_sync::mock::{MockBackend, MockProfile};
//! use devsettings_sync::{catalog, DeviceSettings, MemoryStore, SettingValue, SinkPolicy};
//!
//! fn main() -> devsettings_sync::Result<()> {
//!     let backend = MockBackend::new_profile(MockProfile::GalaxyS2);
//!     let mut settings = DeviceSettings::new(
//!         backend,
//!         catalog::builtin_categories(),
//!         catalog::builtin(),
//!         SinkPolicy::Lenient,
//!     )?;
//!     let mut store = MemoryStore::new();
//!
//!     // Boot: push persisted (or default) values to the hardware
//!     settings.restore_all(&store);
//!
//!     // User toggles dock audio
//!     assert!(settings.on_change(&mut store, "dock_audio", SettingValue::Bool(true))?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod catalog;
pub mod mock;
pub mod registry;
pub mod screen;
pub mod setting;
pub mod store;
pub mod sync;

pub use backend::{Backend, SinkError, SysfsBackend};
pub use registry::{DeviceSettings, RestoreReport};
pub use screen::{Screen, ScreenCategory, ScreenEntry};
pub use setting::{Category, SettingDescriptor, SettingValue, SinkTarget, Support, ValueDomain};
pub use store::{MemoryStore, PreferenceStore, StoreError, TomlStore};
pub use sync::{SettingSync, SinkPolicy, SyncState};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Duplicate setting: {0}")]
    DuplicateSetting(String),

    #[error("Invalid value domain: {0}")]
    InvalidDomain(String),

    #[error("Sink write failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Synchronizer Result type
pub type Result<T> = std::result::Result<T, SyncError>;
