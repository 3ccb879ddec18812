//! Hardware sinks
//!
//! Pushes setting payloads to driver control files under sysfs and emits
//! system broadcasts through the activity manager.

use nix::unistd::{AccessFlags, access};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Broadcast {action} failed: {reason}")]
    Broadcast { action: String, reason: String },
}

/// Access to the hardware a setting is pushed to
pub trait Backend {
    /// Whether a path exists
    fn path_exists(&self, path: &Path) -> bool;

    /// Whether a control file exists and may be written by this process
    fn is_writable(&self, path: &Path) -> bool;

    /// Write a payload to a control file
    fn write_control(&self, path: &Path, payload: &str) -> Result<(), SinkError>;

    /// Emit a system-wide broadcast with a single string extra
    fn broadcast(&self, action: &str, extra: &str, payload: &str) -> Result<(), SinkError>;
}

/// Default program used to emit broadcasts
pub const DEFAULT_BROADCAST_PROGRAM: &str = "am";

/// Backend talking to the real system
#[derive(Debug, Clone)]
pub struct SysfsBackend {
    broadcast_program: String,
}

impl SysfsBackend {
    pub fn new() -> Self {
        Self {
            broadcast_program: DEFAULT_BROADCAST_PROGRAM.to_string(),
        }
    }

    /// Use a different activity-manager style program for broadcasts
    pub fn with_broadcast_program(mut self, program: impl Into<String>) -> Self {
        self.broadcast_program = program.into();
        self
    }

    pub fn broadcast_program(&self) -> &str {
        &self.broadcast_program
    }
}

impl Default for SysfsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for SysfsBackend {
    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_writable(&self, path: &Path) -> bool {
        path.is_file() && access(path, AccessFlags::W_OK).is_ok()
    }

    fn write_control(&self, path: &Path, payload: &str) -> Result<(), SinkError> {
        // Control files are never created: a missing node means missing hardware
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|source| SinkError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        file.write_all(payload.as_bytes())
            .map_err(|source| SinkError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!("Wrote '{}' to {}", payload, path.display());
        Ok(())
    }

    fn broadcast(&self, action: &str, extra: &str, payload: &str) -> Result<(), SinkError> {
        let output = Command::new(&self.broadcast_program)
            .args(["broadcast", "-a", action, "--es", extra, payload, "--user", "all"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SinkError::Broadcast {
                action: action.to_string(),
                reason: format!("{}: {}", self.broadcast_program, e),
            })?;

        if !output.status.success() {
            return Err(SinkError::Broadcast {
                action: action.to_string(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.broadcast_program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        tracing::debug!("Broadcast {} {}={}", action, extra, payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_control_file() {
        let dir = TempDir::new().unwrap();
        let node = dir.path().join("negative");
        fs::write(&node, "0").unwrap();

        let backend = SysfsBackend::new();
        assert!(backend.is_writable(&node));
        backend.write_control(&node, "1").unwrap();
        assert_eq!(fs::read_to_string(&node).unwrap(), "1");
    }

    #[test]
    fn test_missing_control_file_is_not_created() {
        let dir = TempDir::new().unwrap();
        let node = dir.path().join("outdoor");

        let backend = SysfsBackend::new();
        assert!(!backend.is_writable(&node));
        assert!(!backend.path_exists(&node));
        assert!(matches!(
            backend.write_control(&node, "1"),
            Err(SinkError::Write { .. })
        ));
        assert!(!node.exists());
    }

    #[test]
    fn test_directory_is_not_writable_control() {
        let dir = TempDir::new().unwrap();
        let backend = SysfsBackend::new();
        assert!(backend.path_exists(dir.path()));
        assert!(!backend.is_writable(dir.path()));
    }

    #[test]
    fn test_broadcast_missing_program() {
        let backend = SysfsBackend::new().with_broadcast_program("/nonexistent/devsettings-am");
        let err = backend
            .broadcast("com.cyanogenmod.settings.SamsungDock", "data", "1")
            .unwrap_err();
        assert!(err.to_string().contains("SamsungDock"));
    }

    #[test]
    fn test_broadcast_program_exit_status() {
        // `true` accepts any arguments and succeeds, `false` always fails
        let ok = SysfsBackend::new().with_broadcast_program("true");
        assert!(ok.broadcast("a.b.C", "data", "0").is_ok());

        let failing = SysfsBackend::new().with_broadcast_program("false");
        assert!(failing.broadcast("a.b.C", "data", "0").is_err());
    }
}
