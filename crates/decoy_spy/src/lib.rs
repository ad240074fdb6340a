//! DECOY Spies and Mocks
//!
//! Instrumented stand-ins for functions and object methods: call recording,
//! scripted behaviors, argument assertions with readable diffs, and mocks
//! that are declared once and re-bound before every test.
//!
//! ```
//! use decoy_spy::{values, Spy, ObjectRef, Value};
//!
//! let service = ObjectRef::new().with("load", Value::function("load", |_| Ok(Value::from(1))));
//! let spy = Spy::on(&service, "load").unwrap();
//! spy.returns(values![42]);
//!
//! let load = service.get("load").unwrap();
//! let result = load.as_function().unwrap().call(&values!["id"]).unwrap();
//! assert_eq!(result.as_number(), Some(42.0));
//! spy.was_called_with(&values!["id"]).unwrap();
//!
//! spy.restore().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod assert;
mod behavior;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod mock;
pub mod module;
pub mod snapshot;
pub mod spy;

pub use config::{global_config, set_global_config, GlobalConfig, SpyConfig};
pub use error::{SpyError, SpyResult};
pub use ledger::CallRecord;
pub use lifecycle::{setup, HookFn, ManualHooks, TestHooks};
pub use mock::{create_mock, init_mocks, Mock};
pub use module::{mock_module, ModuleResolver, StaticModules};
pub use snapshot::{SnapshotFormat, SnapshotPlugin, SpySnapshotSerializer};
pub use spy::Spy;

// Value model
pub use decoy_core::{values, ArrayRef, CallResult, ErrorValue, Function, Matcher, ObjectRef, Promise, Thrown, Value};
