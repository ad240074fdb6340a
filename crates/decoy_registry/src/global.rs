//! Per-thread registry shared by every spy on the thread.
//!
//! Entries are taken out of the registry before they are restored, so an
//! on-restore callback may use the registry again without a re-entrant borrow.

use crate::entry::{RegistryEntry, RestoreHandle};
use crate::registry::{RegistryError, RestorationRegistry};
use decoy_core::{ObjectRef, Value};
use std::cell::RefCell;

thread_local! {
    static REGISTRY: RefCell<RestorationRegistry> = RefCell::new(RestorationRegistry::new());
}

fn with_mut<R>(f: impl FnOnce(&mut RestorationRegistry) -> R) -> R {
    REGISTRY.with(|registry| f(&mut registry.borrow_mut()))
}

/// Inspect the thread's registry
pub fn with_registry<R>(f: impl FnOnce(&RestorationRegistry) -> R) -> R {
    REGISTRY.with(|registry| f(&registry.borrow()))
}

/// Capture `target[property]` under a fresh handle
///
/// # Errors
///
/// Returns error if the property already has a live patch
pub fn push(target: &ObjectRef, property: &str) -> Result<RestoreHandle, RegistryError> {
    with_mut(|registry| registry.push(target, property))
}

/// Forget an active entry without restoring it
pub fn discard(handle: RestoreHandle) -> bool {
    with_mut(|registry| registry.take(handle)).is_some()
}

/// Restore one active entry
pub fn restore(handle: RestoreHandle) -> bool {
    let entry: Option<RegistryEntry> = with_mut(|registry| registry.take(handle));
    match entry {
        Some(entry) => {
            entry.restore();
            true
        }
        None => false,
    }
}

/// Restore every active entry
pub fn restore_all() -> usize {
    let entries = with_mut(RestorationRegistry::drain_active);
    let count = entries.len();
    for entry in entries {
        entry.restore();
    }
    count
}

/// Move an entry between the active and the persistent partition
pub fn persist(handle: RestoreHandle, into_persistent: bool) -> bool {
    with_mut(|registry| registry.persist(handle, into_persistent))
}

/// Captured original value of a live patch
#[must_use]
pub fn original_method(handle: RestoreHandle) -> Option<Value> {
    with_registry(|registry| registry.original_method(handle))
}

/// Check if `target[property]` has a live patch
#[must_use]
pub fn is_patched(target: &ObjectRef, property: &str) -> bool {
    with_registry(|registry| registry.is_patched(target, property))
}
