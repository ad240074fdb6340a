//! Identifiers and the global call-order counter.
//!
//! Ids are plain monotonically increasing integers. They are process-wide so
//! that sequence numbers taken on different spies are totally ordered.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_FUNCTION_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Function identifier - identifies one callable value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionId(u64);

impl FunctionId {
    /// Allocate a fresh FunctionId
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_FUNCTION_ID.fetch_add(1, Ordering::Relaxed))
    }

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

impl std::fmt::Display for FunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn_{}", self.0)
    }
}

/// Position of a call in the global call order
///
/// Every invocation of every spy consumes the next sequence number, so
/// comparing two sequence numbers tells which call happened first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    /// The position before any call was made
    pub const ZERO: Self = Self(0);

    /// Take the next position from the global counter
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SEQUENCE.fetch_add(1, Ordering::SeqCst))
    }

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

impl Default for SequenceNumber {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
