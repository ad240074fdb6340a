//! The spy: an instrumented stand-in for a function.
//!
//! A spy is a [`Function`] value whose body records every call in a ledger
//! and then delegates to a configurable behavior. Internal state lives in a
//! side table keyed by the function's id, so the installed value carries no
//! extra enumerable members and any installed spy can be recovered with
//! [`Spy::from_value`].

use crate::behavior::{self, Behavior};
use crate::config::{global_config, SpyConfig};
use crate::error::{SpyError, SpyResult};
use crate::ledger::CallRecord;
use crate::snapshot::SnapshotFormat;
use decoy_compare::{serialize, EqualityEngine};
use decoy_core::{CallResult, Function, FunctionId, ObjectRef, SequenceNumber, Value};
use decoy_registry::{global, RestoreHandle};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Name of spies created without one
pub const DEFAULT_SPY_NAME: &str = "the spy";

pub(crate) struct SpyInner {
    name: String,
    property: Option<String>,
    ledger: RefCell<Vec<CallRecord>>,
    behavior: RefCell<Behavior>,
    use_own_equals: Cell<Option<bool>>,
    persistent: Cell<bool>,
    handle: Cell<Option<RestoreHandle>>,
    last_verified: Cell<SequenceNumber>,
    snapshot_format: RefCell<Option<SnapshotFormat>>,
    snapshot: RefCell<Option<String>>,
}

thread_local! {
    static ALL_SPIES: RefCell<Vec<Weak<SpyInner>>> = const { RefCell::new(Vec::new()) };
    static SPY_FUNCTIONS: RefCell<HashMap<FunctionId, Weak<SpyInner>>> = RefCell::new(HashMap::new());
}

fn invoke(inner: &SpyInner, args: &[Value]) -> CallResult {
    let sequence = SequenceNumber::next();
    inner.ledger.borrow_mut().push(CallRecord {
        args: args.to_vec(),
        sequence,
    });
    tracing::trace!(spy = %inner.name, %sequence, "spy invoked");

    let format = inner.snapshot_format.borrow().clone();
    if let Some(format) = format {
        let rendered = format.render(args);
        *inner.snapshot.borrow_mut() = Some(rendered);
    }

    let behavior: Behavior = inner.behavior.borrow().clone();
    behavior(args)
}

/// Instrumented stand-in for a function
///
/// Cloning a spy yields another handle to the same spy.
#[derive(Clone)]
pub struct Spy {
    inner: Rc<SpyInner>,
    function: Function,
}

impl Spy {
    /// Create a freestanding spy
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), None)
    }

    fn build(name: String, property: Option<String>) -> Self {
        let inner = Rc::new(SpyInner {
            name: name.clone(),
            property,
            ledger: RefCell::new(Vec::new()),
            behavior: RefCell::new(behavior::noop()),
            use_own_equals: Cell::new(None),
            persistent: Cell::new(false),
            handle: Cell::new(None),
            last_verified: Cell::new(SequenceNumber::ZERO),
            snapshot_format: RefCell::new(None),
            snapshot: RefCell::new(None),
        });
        let body = Rc::clone(&inner);
        let function = Function::new(name, move |args| invoke(&body, args));

        ALL_SPIES.with(|spies| {
            let mut spies = spies.borrow_mut();
            spies.retain(|spy| spy.strong_count() > 0);
            spies.push(Rc::downgrade(&inner));
        });
        SPY_FUNCTIONS.with(|table| {
            let mut table = table.borrow_mut();
            table.retain(|_, spy| spy.strong_count() > 0);
            table.insert(function.id(), Rc::downgrade(&inner));
        });

        Self { inner, function }
    }

    /// Replace `target[property]` with a new spy
    ///
    /// The original value is captured in the restoration registry first.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the attribute is already spied, is not a
    /// function, or is read-only
    pub fn on(target: &ObjectRef, property: &str) -> SpyResult<Self> {
        let current = target.get(property).unwrap_or_default();
        if Self::is_spy(&current) || global::is_patched(target, property) {
            return Err(SpyError::usage(format!(
                "The object attribute '{property}' was already spied. \
                 Please make sure to spy only once at a time at any attribute."
            )));
        }
        if !current.is_callable() {
            return Err(SpyError::usage(format!(
                "The object attribute '{property}' was not a function but {}. \
                 Only functions can be spied.",
                serialize(&current)
            )));
        }
        if !target.is_writable(property) {
            return Err(SpyError::usage(format!(
                "The object attribute '{property}' is read-only and can not be replaced by a spy."
            )));
        }

        let handle = global::push(target, property)?;
        let spy = Self::build(format!("the spy on '{property}'"), Some(property.to_string()));
        if let Err(err) = target.set(property, spy.function.clone()) {
            global::discard(handle);
            return Err(err.into());
        }
        spy.inner.handle.set(Some(handle));
        tracing::debug!(property, %handle, "spy installed");
        Ok(spy)
    }

    /// Spy several attributes of one object
    ///
    /// Either every attribute is spied or none is.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`on`](Self::on); spies installed before it
    /// are restored
    pub fn on_many(target: &ObjectRef, properties: &[&str]) -> SpyResult<Vec<Self>> {
        let mut spies = Vec::with_capacity(properties.len());
        for property in properties {
            match Self::on(target, property) {
                Ok(spy) => spies.push(spy),
                Err(err) => {
                    for spy in &spies {
                        spy.restore()?;
                    }
                    return Err(err);
                }
            }
        }
        Ok(spies)
    }

    /// Recover the spy behind an installed function value
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let function = value.as_function()?;
        let inner = SPY_FUNCTIONS.with(|table| {
            table
                .borrow()
                .get(&function.id())
                .and_then(Weak::upgrade)
        })?;
        Some(Self {
            inner,
            function: function.clone(),
        })
    }

    /// Check if `value` is a spy
    #[must_use]
    pub fn is_spy(value: &Value) -> bool {
        Self::from_value(value).is_some()
    }

    /// Display name used in diagnostics
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Spied attribute, `None` for freestanding spies
    #[must_use]
    pub fn property(&self) -> Option<&str> {
        self.inner.property.as_deref()
    }

    /// The callable value
    #[must_use]
    pub fn function(&self) -> &Function {
        &self.function
    }

    /// The callable as a value
    #[must_use]
    pub fn as_value(&self) -> Value {
        Value::Function(self.function.clone())
    }

    /// Invoke the spy
    ///
    /// # Errors
    ///
    /// Returns whatever the configured behavior throws
    pub fn call(&self, args: &[Value]) -> CallResult {
        self.function.call(args)
    }

    /// Registry handle of the live patch, if any
    #[must_use]
    pub fn handle(&self) -> Option<RestoreHandle> {
        let handle = self.inner.handle.get()?;
        let live = global::with_registry(|registry| {
            registry.is_active(handle) || registry.is_persistent(handle)
        });
        if live {
            Some(handle)
        } else {
            self.inner.handle.set(None);
            None
        }
    }

    /// Whether the spy's patch survives bulk restoration
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.inner.persistent.get()
    }

    /// Whether comparisons consult own `equals` members
    #[must_use]
    pub fn uses_own_equals(&self) -> bool {
        self.inner
            .use_own_equals
            .get()
            .unwrap_or_else(|| global_config().use_own_equals)
    }

    /// Sequence number of the last call an assertion on this spy verified
    ///
    /// Only recorded while ordering is enforced. Calls at or below it stay
    /// consumed for this spy even after the thread's ordering mark is cleared.
    #[must_use]
    pub fn last_verified(&self) -> SequenceNumber {
        self.inner.last_verified.get()
    }

    pub(crate) fn set_last_verified(&self, sequence: SequenceNumber) {
        if sequence > self.inner.last_verified.get() {
            self.inner.last_verified.set(sequence);
        }
    }

    pub(crate) fn engine(&self) -> EqualityEngine {
        EqualityEngine::new(self.uses_own_equals())
    }

    pub(crate) fn records(&self) -> Vec<CallRecord> {
        self.inner.ledger.borrow().clone()
    }

    fn set_behavior(&self, behavior: Behavior) -> &Self {
        *self.inner.behavior.borrow_mut() = behavior;
        self
    }

    /// Delegate the n-th call to `fns[n]`, repeating the last one
    ///
    /// With no functions the spy returns `undefined`.
    pub fn calls(&self, fns: Vec<Function>) -> &Self {
        self.set_behavior(behavior::sequence(fns))
    }

    /// Return each value in turn, repeating the last
    pub fn returns(&self, values: Vec<Value>) -> &Self {
        self.set_behavior(behavior::returning(values))
    }

    /// Return promises fulfilled with each value in turn
    pub fn resolves(&self, values: Vec<Value>) -> &Self {
        self.set_behavior(behavior::resolving(values))
    }

    /// Return promises rejected with each reason in turn
    ///
    /// Error values are used as they are; strings become the message of a
    /// new error.
    pub fn rejects(&self, reasons: Vec<Value>) -> &Self {
        let behavior = behavior::rejecting(&self.inner.name, reasons);
        self.set_behavior(behavior)
    }

    /// Throw on every call
    ///
    /// `undefined` throws an error saying the spy was requested to throw.
    pub fn throws(&self, reason: impl Into<Value>) -> &Self {
        let behavior = behavior::throwing(&self.inner.name, reason.into());
        self.set_behavior(behavior)
    }

    /// Keep the current behavior for `n` calls, then call the original
    ///
    /// The call in flight counts, so `transparent_after(1)` lets the second
    /// call through. Spies that never patched anything return `undefined`
    /// instead.
    pub fn transparent_after(&self, n: usize) -> &Self {
        let previous: Behavior = self.inner.behavior.borrow().clone();
        let spy = Rc::downgrade(&self.inner);
        self.set_behavior(Rc::new(move |args: &[Value]| {
            let Some(inner) = spy.upgrade() else {
                return previous(args);
            };
            if inner.ledger.borrow().len() <= n {
                return previous(args);
            }
            match inner.handle.get().and_then(global::original_method) {
                Some(Value::Function(original)) => original.call(args),
                _ => Ok(Value::Undefined),
            }
        }))
    }

    /// Call the original on every call
    pub fn transparent(&self) -> &Self {
        self.transparent_after(0)
    }

    /// Clear the ledger; behavior and configuration are kept
    pub fn reset(&self) -> &Self {
        self.inner.ledger.borrow_mut().clear();
        self
    }

    /// Put the original value back
    ///
    /// Freestanding spies and already restored spies are left as they are.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the spy is persistent
    pub fn restore(&self) -> SpyResult<()> {
        if self.inner.persistent.get() {
            return Err(SpyError::usage(format!(
                "{} can not be restored! It was configured to be persistent.",
                self.inner.name
            )));
        }
        if let Some(handle) = self.inner.handle.take() {
            if global::restore(handle) {
                tracing::debug!(spy = %self.inner.name, %handle, "spy restored");
            }
        }
        Ok(())
    }

    /// Apply per-spy settings
    ///
    /// # Errors
    ///
    /// Returns a usage error if persistence is changed on a spy that does
    /// not patch anything
    pub fn configure(&self, config: SpyConfig) -> SpyResult<&Self> {
        if let Some(persistent) = config.persistent {
            let Some(handle) = self.handle() else {
                let change = if persistent { "made persistent" } else { "made non-persistent" };
                return Err(SpyError::usage(format!(
                    "{} can not be {change}! It does not overwrite any object attribute.",
                    self.inner.name
                )));
            };
            global::persist(handle, persistent);
            self.inner.persistent.set(persistent);
            tracing::debug!(spy = %self.inner.name, persistent, "spy persistence changed");
        }
        if let Some(enabled) = config.use_own_equals {
            self.inner.use_own_equals.set(Some(enabled));
        }
        Ok(self)
    }

    /// Render the spy as `format` in snapshots
    pub fn add_snapshot_serializer(&self, format: SnapshotFormat) -> &Self {
        let latest = self
            .inner
            .ledger
            .borrow()
            .last()
            .map(|record| record.args.clone())
            .unwrap_or_default();
        let rendered = format.render(&latest);
        *self.inner.snapshot.borrow_mut() = Some(rendered);
        *self.inner.snapshot_format.borrow_mut() = Some(format);
        self
    }

    /// Cached snapshot rendering, if a serializer was added
    #[must_use]
    pub fn snapshot(&self) -> Option<String> {
        self.inner.snapshot.borrow().clone()
    }

    /// Run `callback` once when the spy's patch is undone
    pub fn on_restore(&self, callback: impl FnOnce() + 'static) -> &Self {
        self.function.set_on_restore(callback);
        self
    }

    /// Clear the ledger of every live spy on this thread
    pub fn reset_all() {
        let spies: Vec<Rc<SpyInner>> =
            ALL_SPIES.with(|spies| spies.borrow().iter().filter_map(Weak::upgrade).collect());
        for spy in spies {
            spy.ledger.borrow_mut().clear();
            spy.last_verified.set(SequenceNumber::ZERO);
        }
    }

    /// Restore every patch that is not persistent
    ///
    /// Returns the number of patches restored.
    pub fn restore_all() -> usize {
        let count = global::restore_all();
        tracing::debug!(count, "all spies restored");
        count
    }
}

impl Default for Spy {
    fn default() -> Self {
        Self::new(DEFAULT_SPY_NAME)
    }
}

impl fmt::Debug for Spy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spy")
            .field("name", &self.inner.name)
            .field("calls", &self.inner.ledger.borrow().len())
            .field("handle", &self.inner.handle.get())
            .finish()
    }
}

impl fmt::Display for Spy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

impl From<Spy> for Value {
    fn from(spy: Spy) -> Self {
        Value::Function(spy.function)
    }
}

impl From<&Spy> for Value {
    fn from(spy: &Spy) -> Self {
        spy.as_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decoy_core::{values, Thrown};
    use std::cell::Cell;

    fn target() -> ObjectRef {
        ObjectRef::new()
            .with("f", Value::function("f", |_| Err(Thrown::error("x"))))
            .with("g", Value::function("g", |args| Ok(args.first().cloned().unwrap_or_default())))
            .with("n", 3)
    }

    #[test]
    fn test_default_name() {
        assert_eq!(Spy::default().name(), DEFAULT_SPY_NAME);
        assert_eq!(Spy::new("fetch").to_string(), "fetch");
    }

    #[test]
    fn test_invocation_records_arguments_in_order() {
        let spy = Spy::new("s");
        assert!(spy.call(&values![1, "a"]).unwrap().is_undefined());
        spy.call(&values![2]).unwrap();

        let records = spy.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].args.len(), 2);
        assert!(records[0].sequence < records[1].sequence);
    }

    #[test]
    fn test_sequence_is_shared_across_spies() {
        let a = Spy::new("a");
        let b = Spy::new("b");
        a.call(&[]).unwrap();
        b.call(&[]).unwrap();
        a.call(&[]).unwrap();
        let (ra, rb) = (a.records(), b.records());
        assert!(ra[0].sequence < rb[0].sequence);
        assert!(rb[0].sequence < ra[1].sequence);
    }

    #[test]
    fn test_returns_and_throws() {
        let spy = Spy::new("s");
        spy.returns(values![1, 2]);
        assert_eq!(spy.call(&[]).unwrap().as_number(), Some(1.0));
        assert_eq!(spy.call(&[]).unwrap().as_number(), Some(2.0));
        assert_eq!(spy.call(&[]).unwrap().as_number(), Some(2.0));

        spy.throws(());
        let thrown = spy.call(&[]).unwrap_err();
        assert_eq!(thrown.message().as_deref(), Some("s was requested to throw"));
        // the throwing call was still recorded
        assert_eq!(spy.records().len(), 4);
    }

    #[test]
    fn test_calls_counts_from_configuration() {
        let spy = Spy::new("s");
        spy.call(&[]).unwrap();
        spy.calls(vec![
            Function::new("first", |_| Ok(Value::from("first"))),
            Function::new("second", |_| Ok(Value::from("second"))),
        ]);
        assert_eq!(spy.call(&[]).unwrap().as_str(), Some("first"));
        assert_eq!(spy.call(&[]).unwrap().as_str(), Some("second"));

        spy.calls(vec![]);
        assert!(spy.call(&[]).unwrap().is_undefined());
    }

    #[test]
    fn test_on_and_restore() {
        let obj = target();
        let original = obj.get("f").unwrap();
        let spy = Spy::on(&obj, "f").unwrap();
        assert_eq!(spy.name(), "the spy on 'f'");
        assert_eq!(spy.property(), Some("f"));

        let installed = obj.get("f").unwrap();
        assert!(installed.as_function().unwrap().call(&[]).unwrap().is_undefined());
        assert_eq!(spy.records().len(), 1);

        spy.restore().unwrap();
        let restored = obj.get("f").unwrap();
        assert!(restored.strict_equals(&original));
        let thrown = restored.as_function().unwrap().call(&[]).unwrap_err();
        assert_eq!(thrown.message().as_deref(), Some("x"));

        // restoring twice is harmless
        spy.restore().unwrap();
        assert!(spy.handle().is_none());
    }

    #[test]
    fn test_on_rejects_double_spy() {
        let obj = target();
        let _spy = Spy::on(&obj, "f").unwrap();
        let err = Spy::on(&obj, "f").unwrap_err();
        assert!(err.is_usage());
        assert!(err.message().contains("already spied"));
        Spy::restore_all();
    }

    #[test]
    fn test_on_rejects_non_function() {
        let obj = target();
        let err = Spy::on(&obj, "n").unwrap_err();
        assert!(err.message().contains("was not a function but 3"));
        let err = Spy::on(&obj, "missing").unwrap_err();
        assert!(err.message().contains("undefined"));
        assert!(!global::is_patched(&obj, "n"));
    }

    #[test]
    fn test_on_rejects_read_only() {
        let obj = ObjectRef::new();
        obj.define_readonly("f", Value::function("f", |_| Ok(Value::Undefined)));
        let err = Spy::on(&obj, "f").unwrap_err();
        assert!(err.message().contains("read-only"));
        assert!(!global::is_patched(&obj, "f"));
    }

    #[test]
    fn test_on_inherited_method() {
        let proto = ObjectRef::new().with("run", Value::function("run", |_| Ok(Value::from(1))));
        let obj = ObjectRef::new().with_prototype(proto.clone());
        let spy = Spy::on(&obj, "run").unwrap();
        assert!(obj.has_own("run"));
        assert!(!Spy::is_spy(&proto.get("run").unwrap()));

        spy.restore().unwrap();
        assert!(!obj.has_own("run"));
    }

    #[test]
    fn test_on_many_rolls_back() {
        let obj = target();
        let err = Spy::on_many(&obj, &["f", "n"]).unwrap_err();
        assert!(err.is_usage());
        assert!(!Spy::is_spy(&obj.get("f").unwrap()));

        let spies = Spy::on_many(&obj, &["f", "g"]).unwrap();
        assert_eq!(spies.len(), 2);
        assert_eq!(Spy::restore_all(), 2);
    }

    #[test]
    fn test_from_value_recovers_installed_spy() {
        let obj = target();
        Spy::on(&obj, "g").unwrap();
        // the handle was dropped, the installed function keeps the spy alive
        let installed = obj.get("g").unwrap();
        installed.as_function().unwrap().call(&values![5]).unwrap();

        let spy = Spy::from_value(&installed).unwrap();
        assert_eq!(spy.records().len(), 1);
        assert!(!Spy::is_spy(&Value::from(1)));
        spy.restore().unwrap();
    }

    #[test]
    fn test_transparent_after() {
        let obj = target();
        let spy = Spy::on(&obj, "g").unwrap();
        spy.returns(values!["stub"]).transparent_after(1);

        assert_eq!(spy.call(&values!["real"]).unwrap().as_str(), Some("stub"));
        assert_eq!(spy.call(&values!["real"]).unwrap().as_str(), Some("real"));
        spy.restore().unwrap();
    }

    #[test]
    fn test_transparent_without_patch_is_noop() {
        let spy = Spy::new("s");
        spy.transparent();
        assert!(spy.call(&values![1]).unwrap().is_undefined());
    }

    #[test]
    fn test_reset_keeps_behavior() {
        let spy = Spy::new("s");
        spy.returns(values![9]);
        spy.call(&[]).unwrap();
        spy.reset();
        assert!(spy.records().is_empty());
        assert_eq!(spy.call(&[]).unwrap().as_number(), Some(9.0));
    }

    #[test]
    fn test_reset_all() {
        let a = Spy::new("a");
        let b = Spy::new("b");
        a.call(&[]).unwrap();
        b.call(&[]).unwrap();
        Spy::reset_all();
        assert!(a.records().is_empty());
        assert!(b.records().is_empty());
    }

    #[test]
    fn test_persistent_spy() {
        let obj = target();
        let spy = Spy::on(&obj, "f").unwrap();
        spy.configure(SpyConfig::new().with_persistent(true)).unwrap();
        assert!(spy.is_persistent());

        let err = spy.restore().unwrap_err();
        assert!(err.message().contains("persistent"));

        assert_eq!(Spy::restore_all(), 0);
        assert!(Spy::is_spy(&obj.get("f").unwrap()));

        spy.configure(SpyConfig::new().with_persistent(false)).unwrap();
        assert_eq!(Spy::restore_all(), 1);
        assert!(!Spy::is_spy(&obj.get("f").unwrap()));
    }

    #[test]
    fn test_persistence_requires_patch() {
        let spy = Spy::new("s");
        let err = spy.configure(SpyConfig::new().with_persistent(true)).unwrap_err();
        assert!(err.is_usage());
        assert!(err.message().contains("s can not be made persistent!"));
        assert!(!spy.is_persistent());

        let err = spy.configure(SpyConfig::new().with_persistent(false)).unwrap_err();
        assert!(err.message().contains("s can not be made non-persistent!"));
        assert!(err.message().contains("does not overwrite any object attribute"));

        spy.configure(SpyConfig::new().with_use_own_equals(false)).unwrap();
        assert!(!spy.uses_own_equals());
    }

    #[test]
    fn test_on_restore_fires_once() {
        let obj = target();
        let spy = Spy::on(&obj, "f").unwrap();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        spy.on_restore(move || counter.set(counter.get() + 1));

        spy.restore().unwrap();
        spy.restore().unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_handle_cleared_by_restore_all() {
        let obj = target();
        let spy = Spy::on(&obj, "f").unwrap();
        assert!(spy.handle().is_some());
        Spy::restore_all();
        assert!(spy.handle().is_none());
        assert!(spy.configure(SpyConfig::new().with_persistent(true)).is_err());
    }
}
