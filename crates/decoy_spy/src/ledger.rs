//! Call ledger rendering.

use decoy_compare::serialize_args;
use decoy_core::{SequenceNumber, Value};

/// Annotation rendered beneath calls made before the ordering mark
pub const CALLED_EARLIER: &str = "called earlier";

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// Arguments exactly as passed
    pub args: Vec<Value>,
    /// Position in the global call order
    pub sequence: SequenceNumber,
}

impl CallRecord {
    /// Whether the call happened after `mark`
    #[must_use]
    pub fn is_after(&self, mark: SequenceNumber) -> bool {
        self.sequence > mark
    }
}

/// Render every ledger entry with an optional annotation line beneath it
///
/// `annotations[i]` belongs to entry `i`; empty annotations are skipped.
/// Entries at or below `mark` are annotated as called earlier instead.
#[must_use]
pub fn show_call_arguments(
    name: &str,
    records: &[CallRecord],
    mark: SequenceNumber,
    annotations: &[String],
) -> String {
    if records.is_empty() {
        return format!("{name} was never called!");
    }
    let mut out = format!("{name} was called with:");
    for (i, record) in records.iter().enumerate() {
        let prefix = format!("call {i}: ");
        out.push_str("\n    ");
        out.push_str(&prefix);
        out.push_str(&serialize_args(&record.args));

        let note = if record.is_after(mark) {
            annotations.get(i).map(String::as_str).unwrap_or("")
        } else {
            CALLED_EARLIER
        };
        if !note.is_empty() {
            out.push_str("\n    ");
            out.push_str(&" ".repeat(prefix.len()));
            out.push_str(note);
        }
    }
    out
}
