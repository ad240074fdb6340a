//! Assertions and structural accessors over a spy's call ledger.
//!
//! Every failing assertion embeds the full ledger. While ordering is
//! enforced, calls at or below the thread's ordering mark, or at or below
//! the last call verified on the same spy, are shown as called earlier and
//! not counted. Each successful assertion moves both marks to the call that
//! satisfied it.

use crate::config::{advance_order_mark, global_config, order_mark};
use crate::error::{SpyError, SpyResult};
use crate::ledger::{self, CallRecord};
use crate::spy::Spy;
use decoy_compare::serialize_args;
use decoy_core::{SequenceNumber, Value};

fn counted(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

fn times(n: usize) -> String {
    counted(n, "time")
}

/// Expected arguments of one call; non-array expectations are a single argument
fn normalize(expected: &Value) -> Vec<Value> {
    match expected {
        Value::Array(items) => items.to_vec(),
        other => vec![other.clone()],
    }
}

impl Spy {
    fn show(&self, records: &[CallRecord], mark: SequenceNumber, annotations: &[String]) -> String {
        ledger::show_call_arguments(self.name(), records, mark, annotations)
    }

    /// Calls at or below this position are not considered
    fn considered_after(&self) -> SequenceNumber {
        if global_config().enforce_order {
            order_mark().max(self.last_verified())
        } else {
            SequenceNumber::ZERO
        }
    }

    fn verified(&self, sequence: SequenceNumber) {
        if global_config().enforce_order {
            self.set_last_verified(sequence);
            advance_order_mark(sequence);
        }
    }

    /// First considered call matching `expected`, or one diff per call
    fn match_calls(
        &self,
        records: &[CallRecord],
        mark: SequenceNumber,
        expected: &[Value],
    ) -> SpyResult<Result<usize, Vec<String>>> {
        let engine = self.engine();
        let mut annotations = vec![String::new(); records.len()];
        for (i, record) in records.iter().enumerate() {
            if !record.is_after(mark) {
                continue;
            }
            match engine.difference_of_args(&record.args, expected)? {
                None => return Ok(Ok(i)),
                Some(diff) => annotations[i] = diff,
            }
        }
        Ok(Err(annotations))
    }

    /// Render the ledger with one optional annotation per call
    #[must_use]
    pub fn show_call_arguments(&self, annotations: &[String]) -> String {
        self.show(&self.records(), self.considered_after(), annotations)
    }

    /// Assert at least one considered call
    ///
    /// # Errors
    ///
    /// Returns an assertion failure if no call is considered
    pub fn was_called(&self) -> SpyResult<()> {
        let mark = self.considered_after();
        let records = self.records();
        if let Some(record) = records.iter().find(|record| record.is_after(mark)) {
            self.verified(record.sequence);
            return Ok(());
        }
        if records.is_empty() {
            return Err(SpyError::assertion(self.show(&records, mark, &[])));
        }
        Err(SpyError::assertion(format!(
            "{} was not called after the last verified call.\n\n{}",
            self.name(),
            self.show(&records, mark, &[])
        )))
    }

    /// Assert exactly `count` considered calls
    ///
    /// # Errors
    ///
    /// Returns an assertion failure if the count differs
    pub fn was_called_times(&self, count: usize) -> SpyResult<()> {
        let mark = self.considered_after();
        let records = self.records();
        let considered: Vec<&CallRecord> =
            records.iter().filter(|record| record.is_after(mark)).collect();
        if considered.len() == count {
            if let Some(last) = considered.last() {
                self.verified(last.sequence);
            }
            return Ok(());
        }
        Err(SpyError::assertion(format!(
            "{} was called {}, but {} expected.\n\n{}",
            self.name(),
            times(considered.len()),
            times(count),
            self.show(&records, mark, &[])
        )))
    }

    /// Assert no considered call
    ///
    /// # Errors
    ///
    /// Returns an assertion failure listing the calls made
    pub fn was_not_called(&self) -> SpyResult<()> {
        let mark = self.considered_after();
        let records = self.records();
        if records.iter().all(|record| !record.is_after(mark)) {
            return Ok(());
        }
        Err(SpyError::assertion(format!(
            "{} was called!\n\n{}",
            self.name(),
            self.show(&records, mark, &[])
        )))
    }

    /// Assert some considered call had arguments equal to `expected`
    ///
    /// # Errors
    ///
    /// Returns an assertion failure with the diff of every call, or the
    /// thrown value if an own `equals` method throws
    pub fn was_called_with(&self, expected: &[Value]) -> SpyResult<()> {
        let mark = self.considered_after();
        let records = self.records();
        match self.match_calls(&records, mark, expected)? {
            Ok(index) => {
                self.verified(records[index].sequence);
                Ok(())
            }
            Err(annotations) => Err(SpyError::assertion(format!(
                "{} was not called with: {}\n\n{}",
                self.name(),
                serialize_args(expected),
                self.show(&records, mark, &annotations)
            ))),
        }
    }

    /// Assert no considered call had arguments equal to `args`
    ///
    /// # Errors
    ///
    /// Returns an assertion failure pointing at the matching call, or the
    /// thrown value if an own `equals` method throws
    pub fn was_not_called_with(&self, args: &[Value]) -> SpyResult<()> {
        let mark = self.considered_after();
        let records = self.records();
        match self.match_calls(&records, mark, args)? {
            Err(_) => Ok(()),
            Ok(index) => {
                let mut annotations = vec![String::new(); records.len()];
                annotations[index] = "<-- matches".to_string();
                Err(SpyError::assertion(format!(
                    "{} was called with: {}\n\n{}",
                    self.name(),
                    serialize_args(args),
                    self.show(&records, mark, &annotations)
                )))
            }
        }
    }

    /// Assert the considered calls match `expected`, one entry per call
    ///
    /// Entries that are not arrays stand for a single argument.
    ///
    /// # Errors
    ///
    /// Returns a usage error when `expected` is empty, an assertion failure
    /// on a length or argument mismatch, or the thrown value if an own
    /// `equals` method throws
    pub fn has_call_history(&self, expected: &[Value]) -> SpyResult<()> {
        if expected.is_empty() {
            return Err(SpyError::usage(format!(
                "has_call_history of {} needs at least one expected call. \
                 Use was_not_called to assert that it was not called.",
                self.name()
            )));
        }
        let mark = self.considered_after();
        let records = self.records();
        let considered: Vec<(usize, &CallRecord)> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.is_after(mark))
            .collect();
        let expected: Vec<Vec<Value>> = expected.iter().map(normalize).collect();

        if considered.len() != expected.len() {
            return Err(SpyError::assertion(format!(
                "{} was called {}, but the expected call history has {}.\n\n{}",
                self.name(),
                times(considered.len()),
                counted(expected.len(), "call"),
                self.show(&records, mark, &[])
            )));
        }

        let engine = self.engine();
        let mut annotations = vec![String::new(); records.len()];
        let mut failed = false;
        for ((index, record), args) in considered.iter().zip(&expected) {
            if let Some(diff) = engine.difference_of_args(&record.args, args)? {
                annotations[*index] = diff;
                failed = true;
            }
        }
        if failed {
            let history: Vec<String> = expected.iter().map(|args| serialize_args(args)).collect();
            return Err(SpyError::assertion(format!(
                "{} does not have the expected call history: {}\n\n{}",
                self.name(),
                history.join(", "),
                self.show(&records, mark, &annotations)
            )));
        }
        if let Some((_, last)) = considered.last() {
            self.verified(last.sequence);
        }
        Ok(())
    }

    /// Arguments of every call
    #[must_use]
    pub fn get_all_call_arguments(&self) -> Vec<Vec<Value>> {
        self.records().into_iter().map(|record| record.args).collect()
    }

    /// Arguments of call `call`
    ///
    /// # Errors
    ///
    /// Returns a usage error listing the ledger if the call does not exist
    pub fn get_call_arguments(&self, call: usize) -> SpyResult<Vec<Value>> {
        let records = self.records();
        match records.get(call) {
            Some(record) => Ok(record.args.clone()),
            None => Err(SpyError::usage(format!(
                "The call {call} does not exist, {} was called {}.\n\n{}",
                self.name(),
                times(records.len()),
                self.show(&records, SequenceNumber::ZERO, &[])
            ))),
        }
    }

    /// Argument `position` of call `call`; `undefined` if it was not passed
    ///
    /// # Errors
    ///
    /// Returns a usage error listing the ledger if the call does not exist
    pub fn get_call_argument(&self, call: usize, position: usize) -> SpyResult<Value> {
        let args = self.get_call_arguments(call)?;
        Ok(args.get(position).cloned().unwrap_or_default())
    }

    /// Argument `position` of the latest call
    ///
    /// # Errors
    ///
    /// Returns a usage error if the spy was never called
    pub fn get_latest_call_argument(&self, position: usize) -> SpyResult<Value> {
        match self.get_call_count() {
            0 => Err(SpyError::usage(self.show(&[], SequenceNumber::ZERO, &[]))),
            count => self.get_call_argument(count - 1, position),
        }
    }

    /// Number of recorded calls
    #[must_use]
    pub fn get_call_count(&self) -> usize {
        self.records().len()
    }
}
