//! Global and per-spy configuration, plus the call ordering mark.

use crate::error::SpyResult;
use decoy_core::SequenceNumber;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// Defaults shared by every spy on the thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Compare objects through their own `equals` member when present
    pub use_own_equals: bool,
    /// Only consider calls made after the last verified one
    pub enforce_order: bool,
}

impl GlobalConfig {
    /// Load from a JSON document; missing fields keep their defaults
    ///
    /// # Errors
    ///
    /// Returns error if the document is not valid configuration JSON
    pub fn from_json(json: &str) -> SpyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set own-equals comparison
    #[must_use]
    pub fn with_use_own_equals(mut self, enabled: bool) -> Self {
        self.use_own_equals = enabled;
        self
    }

    /// Set ordering enforcement
    #[must_use]
    pub fn with_enforce_order(mut self, enabled: bool) -> Self {
        self.enforce_order = enabled;
        self
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            use_own_equals: true,
            enforce_order: false,
        }
    }
}

/// Per-spy settings; `None` leaves a setting unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpyConfig {
    /// Override the global own-equals default
    pub use_own_equals: Option<bool>,
    /// Exempt the spy's patch from bulk restoration
    pub persistent: Option<bool>,
}

impl SpyConfig {
    /// Create an empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set own-equals comparison
    #[must_use]
    pub fn with_use_own_equals(mut self, enabled: bool) -> Self {
        self.use_own_equals = Some(enabled);
        self
    }

    /// Set persistence
    #[must_use]
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = Some(persistent);
        self
    }
}

thread_local! {
    static GLOBAL: Cell<GlobalConfig> = Cell::new(GlobalConfig::default());
    static ORDER_MARK: Cell<SequenceNumber> = const { Cell::new(SequenceNumber::ZERO) };
}

/// Install the thread's default configuration
pub fn set_global_config(config: GlobalConfig) {
    tracing::debug!(?config, "global configuration changed");
    GLOBAL.with(|global| global.set(config));
}

/// Current default configuration
#[must_use]
pub fn global_config() -> GlobalConfig {
    GLOBAL.with(Cell::get)
}

/// Sequence number of the last verified call
///
/// Only meaningful while `enforce_order` is enabled.
#[must_use]
pub fn order_mark() -> SequenceNumber {
    ORDER_MARK.with(Cell::get)
}

/// Forget every verified call
pub fn clear_order_mark() {
    ORDER_MARK.with(|mark| mark.set(SequenceNumber::ZERO));
}

/// Move the mark forward to `sequence`; never moves it back
pub(crate) fn advance_order_mark(sequence: SequenceNumber) {
    if !global_config().enforce_order {
        return;
    }
    ORDER_MARK.with(|mark| {
        if sequence > mark.get() {
            mark.set(sequence);
        }
    });
}
