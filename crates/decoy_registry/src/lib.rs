//! DECOY Restoration Registry
//!
//! Captures the original value of every patched property so each patch can
//! be undone exactly once, individually or in bulk.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entry;
pub mod global;
pub mod registry;

pub use entry::{RegistryEntry, RestoreHandle};
pub use registry::{RegistryError, RestorationRegistry};
