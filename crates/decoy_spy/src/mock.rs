//! Deferred mocks.
//!
//! A mock is declared once, before any test runs, and re-bound before every
//! test: [`create_mock`] returns a placeholder whose methods throw until
//! [`init_mocks`] (normally the before-each hook installed by
//! [`lifecycle::setup`](crate::lifecycle::setup)) installs live spies.

use crate::error::{SpyError, SpyResult};
use crate::lifecycle;
use crate::spy::Spy;
use decoy_core::{ObjectRef, Thrown, Value};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

struct MockInner {
    target: ObjectRef,
    placeholder: ObjectRef,
    /// Method name to "a live spy is installed"
    methods: IndexMap<String, Rc<Cell<bool>>>,
}

thread_local! {
    static MOCKS: RefCell<Vec<Weak<MockInner>>> = const { RefCell::new(Vec::new()) };
}

fn uninitialized(name: &str) -> Value {
    let message = format!("Method '{name}' was not initialized on Mock.");
    Value::function(name, move |_| Err(Thrown::error(message.clone())))
}

/// Placeholder for methods of a target object
#[derive(Clone)]
pub struct Mock {
    inner: Rc<MockInner>,
}

/// Declare a mock of `methods` on `target`
///
/// Nothing is patched until the mock is initialized.
///
/// # Errors
///
/// Returns a usage error if a test is currently running
pub fn create_mock(target: &ObjectRef, methods: &[&str]) -> SpyResult<Mock> {
    if lifecycle::is_test_running() {
        return Err(SpyError::usage(
            "Mocks can not be created while a test is running. \
             Declare them before the tests, they are initialized before each test.",
        ));
    }

    let placeholder = ObjectRef::new();
    let mut states = IndexMap::with_capacity(methods.len());
    for name in methods {
        placeholder.set(name, uninitialized(name))?;
        states.insert((*name).to_string(), Rc::new(Cell::new(false)));
    }
    let inner = Rc::new(MockInner {
        target: target.clone(),
        placeholder,
        methods: states,
    });
    MOCKS.with(|mocks| {
        let mut mocks = mocks.borrow_mut();
        mocks.retain(|mock| mock.strong_count() > 0);
        mocks.push(Rc::downgrade(&inner));
    });
    Ok(Mock { inner })
}

/// Initialize every declared mock on this thread
///
/// # Errors
///
/// Returns the first initialization error
pub fn init_mocks() -> SpyResult<()> {
    let mocks: Vec<Rc<MockInner>> =
        MOCKS.with(|mocks| mocks.borrow().iter().filter_map(Weak::upgrade).collect());
    for inner in mocks {
        Mock { inner }.init()?;
    }
    Ok(())
}

impl Mock {
    /// Install a spy for every method that has none
    ///
    /// Restoring one of the spies marks its method inactive again, so the
    /// next initialization installs a fresh spy.
    ///
    /// # Errors
    ///
    /// Returns a usage error naming the method that could not be patched
    pub fn init(&self) -> SpyResult<()> {
        for (name, active) in &self.inner.methods {
            if active.get() {
                continue;
            }
            let spy = Spy::on(&self.inner.target, name).map_err(|err| {
                SpyError::usage(format!(
                    "Could not initialize mock for method '{name}': {}\n\
                     Make sure '{name}' is a writable function attribute of the mocked object. \
                     Module exports can be made writable by resolving the module through StaticModules.",
                    err.message()
                ))
            })?;
            let flag = Rc::clone(active);
            spy.on_restore(move || flag.set(false));
            self.inner.placeholder.set(name, spy.as_value())?;
            active.set(true);
            tracing::debug!(method = %name, "mock method initialized");
        }
        Ok(())
    }

    /// Object holding the stubs or live spies
    #[must_use]
    pub fn placeholder(&self) -> &ObjectRef {
        &self.inner.placeholder
    }

    /// Object whose methods are replaced
    #[must_use]
    pub fn target(&self) -> &ObjectRef {
        &self.inner.target
    }

    /// Mocked method names in declaration order
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.inner.methods.keys().map(String::as_str)
    }

    /// Whether `method` currently has a live spy installed
    #[must_use]
    pub fn is_active(&self, method: &str) -> bool {
        self.inner
            .methods
            .get(method)
            .is_some_and(|active| active.get())
    }

    /// Live spy of `method`
    ///
    /// # Errors
    ///
    /// Returns a usage error if the method is not mocked or not yet initialized
    pub fn spy(&self, method: &str) -> SpyResult<Spy> {
        let value = self.inner.placeholder.get_own(method).ok_or_else(|| {
            SpyError::usage(format!("Method '{method}' is not part of this Mock."))
        })?;
        Spy::from_value(&value).ok_or_else(|| {
            SpyError::usage(format!("Method '{method}' was not initialized on Mock."))
        })
    }
}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mock")
            .field("target", &self.inner.target)
            .field("methods", &self.inner.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}
