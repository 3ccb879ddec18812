//! Mock backend for testing without real hardware
//!
//! Records every control-file write and broadcast instead of touching the
//! system, so settings can be exercised on a desktop machine.
//!
//! # Usage
//!
//! ```
//! use devsettings_sync::mock::{MockBackend, MockProfile};
//!
//! // All Galaxy S2 control nodes present
//! let backend = MockBackend::new_profile(MockProfile::GalaxyS2);
//! assert!(backend.writes().is_empty());
//! ```

use crate::backend::{Backend, SinkError};
use crate::catalog;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Environment variable selecting a mock profile by name
pub const MOCK_DEVICE_ENV: &str = "DEVSETTINGS_MOCK_DEVICE";

/// Pre-defined mock hardware layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockProfile {
    /// Every built-in control node present
    GalaxyS2,
    /// Kernel without the mDNIe driver
    GalaxyS2NoMdnie,
    /// Desktop development, no control nodes at all
    Desktop,
}

impl MockProfile {
    /// Parse profile from a name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().replace(['-', '_'], "").as_str() {
            "galaxys2" | "i9100" => Some(MockProfile::GalaxyS2),
            "galaxys2nomdnie" | "nomdnie" => Some(MockProfile::GalaxyS2NoMdnie),
            "desktop" => Some(MockProfile::Desktop),
            _ => None,
        }
    }

    /// Profile named by `DEVSETTINGS_MOCK_DEVICE`, if set and known
    pub fn from_env() -> Option<Self> {
        std::env::var(MOCK_DEVICE_ENV)
            .ok()
            .and_then(|name| Self::from_name(&name))
    }

    /// Control nodes present on this layout
    pub fn control_paths(self) -> Vec<PathBuf> {
        let builtin = catalog::builtin();
        let paths = builtin
            .iter()
            .filter_map(|d| d.control_path())
            .map(Path::to_path_buf);

        match self {
            MockProfile::GalaxyS2 => paths.collect(),
            MockProfile::GalaxyS2NoMdnie => paths
                .filter(|p| !p.starts_with("/sys/class/mdnie"))
                .collect(),
            MockProfile::Desktop => Vec::new(),
        }
    }
}

/// A single recorded sink write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkWrite {
    Control { path: PathBuf, payload: String },
    Broadcast { action: String, extra: String, payload: String },
}

impl SinkWrite {
    pub fn control(path: impl Into<PathBuf>, payload: &str) -> Self {
        SinkWrite::Control {
            path: path.into(),
            payload: payload.to_string(),
        }
    }

    pub fn broadcast(action: &str, extra: &str, payload: &str) -> Self {
        SinkWrite::Broadcast {
            action: action.to_string(),
            extra: extra.to_string(),
            payload: payload.to_string(),
        }
    }
}

/// Mock hardware state
#[derive(Debug, Default)]
struct MockState {
    /// Control node path to its current contents
    controls: HashMap<PathBuf, String>,
    writes: Vec<SinkWrite>,
    /// Make every sink write fail
    failing: bool,
}

/// Backend recording writes in shared state
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<RwLock<MockState>>,
}

impl MockBackend {
    /// Backend with no control nodes
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with the control nodes of a mock profile, all holding "0"
    pub fn new_profile(profile: MockProfile) -> Self {
        let backend = Self::new();
        for path in profile.control_paths() {
            backend.add_control(path);
        }
        backend
    }

    pub fn with_control(self, path: impl Into<PathBuf>) -> Self {
        self.add_control(path);
        self
    }

    /// Make a control node appear
    pub fn add_control(&self, path: impl Into<PathBuf>) {
        if let Ok(mut state) = self.state.write() {
            state.controls.insert(path.into(), "0".to_string());
        }
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut state) = self.state.write() {
            state.failing = failing;
        }
    }

    /// Current contents of a control node
    pub fn control_value(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.controls.get(path.as_ref()).cloned())
    }

    /// All writes recorded so far, oldest first
    pub fn writes(&self) -> Vec<SinkWrite> {
        self.state
            .read()
            .map(|s| s.writes.clone())
            .unwrap_or_default()
    }

    pub fn last_write(&self) -> Option<SinkWrite> {
        self.state.read().ok().and_then(|s| s.writes.last().cloned())
    }

    /// Forget recorded writes; control contents are kept
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.write() {
            state.writes.clear();
        }
    }
}

impl Backend for MockBackend {
    fn path_exists(&self, path: &Path) -> bool {
        self.state
            .read()
            .map(|s| s.controls.contains_key(path))
            .unwrap_or(false)
    }

    fn is_writable(&self, path: &Path) -> bool {
        self.path_exists(path)
    }

    fn write_control(&self, path: &Path, payload: &str) -> Result<(), SinkError> {
        let mut state = self.state.write().map_err(|_| SinkError::Write {
            path: path.to_path_buf(),
            source: io::Error::other("mock state poisoned"),
        })?;

        if state.failing {
            return Err(SinkError::Write {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "mock failure"),
            });
        }

        match state.controls.get_mut(path) {
            Some(contents) => *contents = payload.to_string(),
            None => {
                return Err(SinkError::Write {
                    path: path.to_path_buf(),
                    source: io::Error::from(io::ErrorKind::NotFound),
                });
            }
        }

        state.writes.push(SinkWrite::control(path, payload));
        tracing::debug!("[MOCK] {} <- {}", path.display(), payload);
        Ok(())
    }

    fn broadcast(&self, action: &str, extra: &str, payload: &str) -> Result<(), SinkError> {
        let mut state = self.state.write().map_err(|_| SinkError::Broadcast {
            action: action.to_string(),
            reason: "mock state poisoned".to_string(),
        })?;

        if state.failing {
            return Err(SinkError::Broadcast {
                action: action.to_string(),
                reason: "mock failure".to_string(),
            });
        }

        state.writes.push(SinkWrite::broadcast(action, extra, payload));
        tracing::debug!("[MOCK] broadcast {} {}={}", action, extra, payload);
        Ok(())
    }
}
