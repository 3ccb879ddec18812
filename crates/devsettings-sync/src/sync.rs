//! Per-setting synchronizer
//!
//! [`SettingSync`] ties one [`SettingDescriptor`] to the persistence store and
//! the hardware sink: restore on startup, apply on change.

use crate::backend::Backend;
use crate::store::PreferenceStore;
use crate::{Result, SettingDescriptor, SettingValue, SinkTarget, Support, SyncError};

/// What to do when a sink write fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkPolicy {
    /// Log and carry on; sink writes are fire-and-forget
    #[default]
    Lenient,
    /// Propagate the failure to the caller
    Strict,
}

/// Lifecycle state of a setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Hardware missing; hidden and never written
    Unsupported,
    Idle,
    /// A change event is being applied
    Updating,
}

/// Synchronizer for a single setting
#[derive(Debug, Clone)]
pub struct SettingSync {
    descriptor: SettingDescriptor,
    state: SyncState,
    policy: SinkPolicy,
}

impl SettingSync {
    /// Create the synchronizer, evaluating the support predicate once.
    /// Unsupported is terminal.
    pub fn new<B: Backend + ?Sized>(descriptor: SettingDescriptor, backend: &B) -> Self {
        let state = if check_support(&descriptor.support, backend) {
            SyncState::Idle
        } else {
            tracing::debug!("{} unsupported ({:?})", descriptor.id, descriptor.support);
            SyncState::Unsupported
        };

        Self {
            descriptor,
            state,
            policy: SinkPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SinkPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &SettingDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_supported(&self) -> bool {
        self.state != SyncState::Unsupported
    }

    /// Current value: the persisted one if in-domain, else the default
    pub fn current_value<S: PreferenceStore + ?Sized>(&self, store: &S) -> SettingValue {
        self.descriptor.domain.resolve(store.get(&self.descriptor.id))
    }

    /// Push the persisted value to the sink. Returns whether a write was
    /// attempted; unsupported settings are left alone.
    pub fn restore<S, B>(&self, store: &S, backend: &B) -> Result<bool>
    where
        S: PreferenceStore + ?Sized,
        B: Backend + ?Sized,
    {
        if !self.is_supported() {
            return Ok(false);
        }

        let value = self.current_value(store);
        tracing::info!("Restoring {} = {}", self.descriptor.id, value);
        self.push(backend, &value)?;
        Ok(true)
    }

    /// Apply a change event. Out-of-domain values and unsupported settings
    /// are rejected with `false`, touching neither store nor sink.
    pub fn on_change<S, B>(
        &mut self,
        store: &mut S,
        backend: &B,
        value: SettingValue,
    ) -> Result<bool>
    where
        S: PreferenceStore + ?Sized,
        B: Backend + ?Sized,
    {
        if !self.is_supported() {
            tracing::warn!("Ignoring change to unsupported setting {}", self.descriptor.id);
            return Ok(false);
        }

        if !self.descriptor.domain.contains(&value) {
            tracing::warn!(
                "Rejected {} = {:?}: not a valid {} value",
                self.descriptor.id,
                value,
                self.descriptor.domain.kind()
            );
            return Ok(false);
        }

        self.state = SyncState::Updating;
        let result = self.apply(store, backend, value);
        self.state = SyncState::Idle;

        result.map(|()| true)
    }

    /// Parse raw user input into the setting's domain, then apply it
    pub fn on_change_str<S, B>(&mut self, store: &mut S, backend: &B, raw: &str) -> Result<bool>
    where
        S: PreferenceStore + ?Sized,
        B: Backend + ?Sized,
    {
        match self.descriptor.domain.parse(raw) {
            Some(value) => self.on_change(store, backend, value),
            None => {
                tracing::warn!("Rejected {} = '{}': unparseable", self.descriptor.id, raw);
                Ok(false)
            }
        }
    }

    fn apply<S, B>(&self, store: &mut S, backend: &B, value: SettingValue) -> Result<()>
    where
        S: PreferenceStore + ?Sized,
        B: Backend + ?Sized,
    {
        store.set(&self.descriptor.id, value.clone())?;
        tracing::info!("{} set to {}", self.descriptor.id, value);
        self.push(backend, &value)
    }

    fn push<B: Backend + ?Sized>(&self, backend: &B, value: &SettingValue) -> Result<()> {
        let payload = value.payload();
        let result = match &self.descriptor.sink {
            SinkTarget::ControlFile { path } => backend.write_control(path, &payload),
            SinkTarget::Broadcast { action, extra } => backend.broadcast(action, extra, &payload),
        };

        match (result, self.policy) {
            (Ok(()), _) => Ok(()),
            (Err(e), SinkPolicy::Lenient) => {
                tracing::warn!("{}: {}", self.descriptor.id, e);
                Ok(())
            }
            (Err(e), SinkPolicy::Strict) => Err(SyncError::Sink(e)),
        }
    }
}

fn check_support<B: Backend + ?Sized>(support: &Support, backend: &B) -> bool {
    match support {
        Support::Always => true,
        Support::Never => false,
        Support::PathExists(path) => backend.path_exists(path),
        Support::Writable(path) => backend.is_writable(path),
    }
}
