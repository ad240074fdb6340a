//! Registry entries: one captured patch each.

use decoy_core::{ObjectRef, Value};
use serde::{Deserialize, Serialize};

/// Opaque handle referencing one active or persisted patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RestoreHandle(u64);

impl RestoreHandle {
    /// Create from a raw value
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RestoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "restore_{}", self.0)
    }
}

/// Everything needed to undo one patch
///
/// The target is not owned: it is a reference into caller-owned state.
#[derive(Clone)]
pub struct RegistryEntry {
    target: ObjectRef,
    property: String,
    original: Value,
    was_own: bool,
}

impl RegistryEntry {
    /// Capture the current value of `target[property]`
    #[must_use]
    pub fn capture(target: &ObjectRef, property: &str) -> Self {
        Self {
            target: target.clone(),
            property: property.to_string(),
            original: target.get(property).unwrap_or_default(),
            was_own: target.has_own(property),
        }
    }

    /// Patched object
    #[must_use]
    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Patched property name
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Value captured before patching
    #[must_use]
    pub fn original(&self) -> &Value {
        &self.original
    }

    /// Whether this entry patches `property` on `target`
    #[must_use]
    pub fn covers(&self, target: &ObjectRef, property: &str) -> bool {
        self.target.ptr_eq(target) && self.property == property
    }

    /// Write the captured value back and fire the on-restore callback of the
    /// value that was installed
    ///
    /// Never fails: a target mutated since the patch is restored as far as
    /// its current shape allows.
    pub fn restore(self) {
        let installed = self.target.get_own(&self.property);
        if self.was_own {
            if let Err(err) = self.target.set(&self.property, self.original.clone()) {
                tracing::warn!(property = %self.property, error = %err, "could not write original value back");
            }
        } else {
            self.target.remove(&self.property);
        }
        tracing::debug!(property = %self.property, "patch restored");
        if let Some(Value::Function(func)) = installed {
            func.fire_on_restore();
        }
    }
}
