//! Restoration registry for reversible patches.

use crate::entry::{RegistryEntry, RestoreHandle};
use decoy_core::{ObjectRef, Value};
use indexmap::IndexMap;

/// Error from registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The property already has a live patch
    #[error("Property '{property}' is already patched")]
    AlreadyPatched {
        /// Property name
        property: String,
    },
}

/// Registry of captured patches
///
/// Every mutation of a caller-owned object is captured here first, keyed by
/// a fresh handle. Entries live in one of two partitions: `active` entries
/// are undone by [`restore_all`](Self::restore_all), `persistent` ones are
/// not until they are moved back.
pub struct RestorationRegistry {
    /// Entries undone by bulk restoration
    active: IndexMap<RestoreHandle, RegistryEntry>,
    /// Entries exempt from bulk restoration
    persistent: IndexMap<RestoreHandle, RegistryEntry>,
    next_handle: u64,
}

impl RestorationRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: IndexMap::new(),
            persistent: IndexMap::new(),
            next_handle: 1,
        }
    }

    /// Capture `target[property]` under a fresh handle
    ///
    /// # Errors
    ///
    /// Returns error if the property already has a live patch in either partition
    pub fn push(&mut self, target: &ObjectRef, property: &str) -> Result<RestoreHandle, RegistryError> {
        if self.is_patched(target, property) {
            return Err(RegistryError::AlreadyPatched {
                property: property.to_string(),
            });
        }
        let handle = RestoreHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        self.active.insert(handle, RegistryEntry::capture(target, property));
        tracing::debug!(%handle, property, "patch captured");
        Ok(handle)
    }

    /// Remove an active entry without restoring it
    pub fn take(&mut self, handle: RestoreHandle) -> Option<RegistryEntry> {
        self.active.shift_remove(&handle)
    }

    /// Remove every active entry without restoring them
    pub fn drain_active(&mut self) -> Vec<RegistryEntry> {
        self.active.drain(..).map(|(_, entry)| entry).collect()
    }

    /// Restore one active entry
    ///
    /// Returns false if the handle is unknown, already restored, or persistent.
    pub fn restore(&mut self, handle: RestoreHandle) -> bool {
        match self.take(handle) {
            Some(entry) => {
                entry.restore();
                true
            }
            None => false,
        }
    }

    /// Restore every active entry; persistent entries stay patched
    ///
    /// Returns the number of entries restored.
    pub fn restore_all(&mut self) -> usize {
        let entries = self.drain_active();
        let count = entries.len();
        for entry in entries {
            entry.restore();
        }
        count
    }

    /// Move an entry between the active and the persistent partition
    ///
    /// Returns false if the handle is not in the source partition.
    pub fn persist(&mut self, handle: RestoreHandle, into_persistent: bool) -> bool {
        let (from, to) = if into_persistent {
            (&mut self.active, &mut self.persistent)
        } else {
            (&mut self.persistent, &mut self.active)
        };
        match from.shift_remove(&handle) {
            Some(entry) => {
                to.insert(handle, entry);
                tracing::debug!(%handle, persistent = into_persistent, "patch partition changed");
                true
            }
            None => false,
        }
    }

    /// Captured original value, without altering registry state
    #[must_use]
    pub fn original_method(&self, handle: RestoreHandle) -> Option<Value> {
        self.active
            .get(&handle)
            .or_else(|| self.persistent.get(&handle))
            .map(|entry| entry.original().clone())
    }

    /// Check if `target[property]` has a live patch
    #[must_use]
    pub fn is_patched(&self, target: &ObjectRef, property: &str) -> bool {
        self.active
            .values()
            .chain(self.persistent.values())
            .any(|entry| entry.covers(target, property))
    }

    /// Check if the handle is in the persistent partition
    #[must_use]
    pub fn is_persistent(&self, handle: RestoreHandle) -> bool {
        self.persistent.contains_key(&handle)
    }

    /// Check if the handle is in the active partition
    #[must_use]
    pub fn is_active(&self, handle: RestoreHandle) -> bool {
        self.active.contains_key(&handle)
    }

    /// Number of active entries
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of persistent entries
    #[must_use]
    pub fn persistent_count(&self) -> usize {
        self.persistent.len()
    }

    /// Check if no patch is live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.persistent.is_empty()
    }
}

impl Default for RestorationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn target() -> (ObjectRef, Value) {
        let original = Value::function("m", |_| Ok(Value::from("original")));
        (ObjectRef::new().with("m", original.clone()), original)
    }

    #[test]
    fn test_registry_new() {
        let registry = RestorationRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_push_and_restore_round_trip() {
        let mut registry = RestorationRegistry::new();
        let (obj, original) = target();

        let handle = registry.push(&obj, "m").unwrap();
        obj.set("m", "patched").unwrap();
        assert!(registry.is_patched(&obj, "m"));

        assert!(registry.restore(handle));
        let restored = obj.get("m").unwrap();
        assert!(restored.strict_equals(&original));
        assert!(!registry.is_patched(&obj, "m"));
    }

    #[test]
    fn test_restore_is_idempotent() {
        let mut registry = RestorationRegistry::new();
        let (obj, _) = target();
        let handle = registry.push(&obj, "m").unwrap();

        assert!(registry.restore(handle));
        obj.set("m", "later").unwrap();
        assert!(!registry.restore(handle));
        assert_eq!(obj.get("m").unwrap().as_str(), Some("later"));
    }

    #[test]
    fn test_restore_unknown_handle() {
        let mut registry = RestorationRegistry::new();
        assert!(!registry.restore(RestoreHandle::from_raw(99)));
    }

    #[test]
    fn test_handles_are_unique() {
        let mut registry = RestorationRegistry::new();
        let (obj, _) = target();
        let a = registry.push(&obj, "m").unwrap();
        let b = registry.push(&obj, "n").unwrap();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_double_patch_rejected() {
        let mut registry = RestorationRegistry::new();
        let (obj, _) = target();
        registry.push(&obj, "m").unwrap();
        let result = registry.push(&obj, "m");
        assert_eq!(
            result,
            Err(RegistryError::AlreadyPatched {
                property: "m".to_string()
            })
        );

        // the same name on another object is independent
        let (other, _) = target();
        assert!(registry.push(&other, "m").is_ok());
    }

    #[test]
    fn test_persistent_entries_survive_restore_all() {
        let mut registry = RestorationRegistry::new();
        let (obj, original) = target();
        let handle = registry.push(&obj, "m").unwrap();
        obj.set("m", "patched").unwrap();

        assert!(registry.persist(handle, true));
        assert!(registry.is_persistent(handle));
        assert_eq!(registry.restore_all(), 0);
        assert_eq!(obj.get("m").unwrap().as_str(), Some("patched"));

        // single restore ignores persistent entries too
        assert!(!registry.restore(handle));

        assert!(registry.persist(handle, false));
        assert_eq!(registry.restore_all(), 1);
        assert!(obj.get("m").unwrap().strict_equals(&original));
    }

    #[test]
    fn test_persist_missing_handle_is_noop() {
        let mut registry = RestorationRegistry::new();
        let (obj, _) = target();
        let handle = registry.push(&obj, "m").unwrap();
        assert!(!registry.persist(handle, false));
        assert!(registry.is_active(handle));
    }

    #[test]
    fn test_original_method_lookup() {
        let mut registry = RestorationRegistry::new();
        let (obj, original) = target();
        let handle = registry.push(&obj, "m").unwrap();
        obj.set("m", "patched").unwrap();

        let found = registry.original_method(handle).unwrap();
        assert!(found.strict_equals(&original));
        // lookup does not alter state
        assert!(registry.is_active(handle));

        registry.persist(handle, true);
        assert!(registry.original_method(handle).is_some());
    }

    #[test]
    fn test_restore_all_tolerates_external_mutation() {
        let mut registry = RestorationRegistry::new();
        let (obj, original) = target();
        registry.push(&obj, "m").unwrap();
        obj.remove("m");
        assert_eq!(registry.restore_all(), 1);
        assert!(obj.get("m").unwrap().strict_equals(&original));
    }

    #[test]
    fn test_restore_fires_on_restore_callback() {
        let mut registry = RestorationRegistry::new();
        let (obj, _) = target();
        let handle = registry.push(&obj, "m").unwrap();

        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        let replacement = decoy_core::Function::new("replacement", |_| Ok(Value::Undefined));
        replacement.set_on_restore(move || flag.set(true));
        obj.set("m", replacement).unwrap();

        registry.restore(handle);
        assert!(fired.get());
    }

    proptest! {
        #[test]
        fn prop_restore_all_keeps_only_persistent(flags in prop::collection::vec(any::<bool>(), 1..12)) {
            let mut registry = RestorationRegistry::new();
            let obj = ObjectRef::new();
            let mut handles = Vec::new();
            for (i, _) in flags.iter().enumerate() {
                let key = format!("m{i}");
                obj.set(&key, Value::from("original")).unwrap();
                handles.push(registry.push(&obj, &key).unwrap());
                obj.set(&key, Value::from("patched")).unwrap();
            }
            for (handle, persistent) in handles.iter().zip(&flags) {
                if *persistent {
                    registry.persist(*handle, true);
                }
            }
            registry.restore_all();
            for (i, persistent) in flags.iter().enumerate() {
                let expected = if *persistent { "patched" } else { "original" };
                let key = format!("m{i}");
                let value = obj.get(&key).unwrap();
                prop_assert_eq!(value.as_str(), Some(expected));
            }
            prop_assert_eq!(registry.active_count(), 0);
        }
    }
}
