//! Test runner integration.
//!
//! The runner is an injected collaborator: it accepts before-each and
//! after-each callbacks and tells whether a test is currently running.
//! [`setup`] registers one hook of each kind on it.

use crate::config::clear_order_mark;
use crate::error::{SpyError, SpyResult};
use crate::mock::init_mocks;
use crate::spy::Spy;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Callback registered with the test runner
pub type HookFn = Rc<dyn Fn() -> SpyResult<()>>;

/// Lifecycle hooks of a test runner
pub trait TestHooks {
    /// Run `hook` before every test
    fn before_each(&self, hook: HookFn);

    /// Run `hook` after every test
    fn after_each(&self, hook: HookFn);

    /// Whether a test is currently running
    fn is_test_running(&self) -> bool;
}

thread_local! {
    static HOOKS: RefCell<Option<Rc<dyn TestHooks>>> = const { RefCell::new(None) };
}

/// Register the spy lifecycle with a test runner
///
/// Before each test every declared mock is initialized. After each test
/// every non-persistent patch is restored, every ledger is cleared and the
/// ordering mark is reset; `after_each` runs last.
///
/// # Errors
///
/// Returns a usage error if hooks were already set up on this thread
pub fn setup(hooks: Rc<dyn TestHooks>, after_each: Option<HookFn>) -> SpyResult<()> {
    if HOOKS.with(|installed| installed.borrow().is_some()) {
        return Err(SpyError::usage(
            "The spy lifecycle was already set up. Call setup only once per test thread.",
        ));
    }

    hooks.before_each(Rc::new(init_mocks));
    hooks.after_each(Rc::new(move || {
        Spy::restore_all();
        Spy::reset_all();
        clear_order_mark();
        match &after_each {
            Some(callback) => callback(),
            None => Ok(()),
        }
    }));
    HOOKS.with(|installed| *installed.borrow_mut() = Some(hooks));
    tracing::debug!("spy lifecycle hooks installed");
    Ok(())
}

/// Whether the registered runner reports a running test
///
/// `false` when [`setup`] was never called.
#[must_use]
pub fn is_test_running() -> bool {
    let hooks = HOOKS.with(|installed| installed.borrow().clone());
    hooks.is_some_and(|hooks| hooks.is_test_running())
}

/// Test runner driven by hand
///
/// For harnesses without native before/after hooks: wrap each test body in
/// [`run_test`](Self::run_test).
#[derive(Default)]
pub struct ManualHooks {
    before: RefCell<Vec<HookFn>>,
    after: RefCell<Vec<HookFn>>,
    running: Cell<bool>,
}

impl ManualHooks {
    /// Create a driver with no hooks
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a test as running and run the before-each hooks
    ///
    /// # Errors
    ///
    /// Returns the first hook error
    pub fn begin_test(&self) -> SpyResult<()> {
        self.running.set(true);
        let hooks = self.before.borrow().clone();
        hooks.iter().try_for_each(|hook| hook())
    }

    /// Run the after-each hooks and mark the test as finished
    ///
    /// # Errors
    ///
    /// Returns the first hook error
    pub fn end_test(&self) -> SpyResult<()> {
        let hooks = self.after.borrow().clone();
        let result = hooks.iter().try_for_each(|hook| hook());
        self.running.set(false);
        result
    }

    /// Run `test` between [`begin_test`](Self::begin_test) and
    /// [`end_test`](Self::end_test)
    ///
    /// The after-each hooks run even when setup or the test fails.
    ///
    /// # Errors
    ///
    /// Returns the first error of setup, the test, or teardown
    pub fn run_test<F>(&self, test: F) -> SpyResult<()>
    where
        F: FnOnce() -> SpyResult<()>,
    {
        let outcome = self.begin_test().and_then(|()| test());
        let teardown = self.end_test();
        outcome.and(teardown)
    }
}

impl TestHooks for ManualHooks {
    fn before_each(&self, hook: HookFn) {
        self.before.borrow_mut().push(hook);
    }

    fn after_each(&self, hook: HookFn) {
        self.after.borrow_mut().push(hook);
    }

    fn is_test_running(&self) -> bool {
        self.running.get()
    }
}
