//! DECOY Core Types
//!
//! Dynamic values, thrown errors and identifiers shared by every DECOY crate.
//! Nothing in here patches objects or records calls.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod matcher;
pub mod value;

// Re-exports
pub use error::{CoreError, CoreResult, Thrown};
pub use id::{FunctionId, SequenceNumber};
pub use matcher::{Matcher, MatcherKind, Predicate};
pub use value::{ArrayRef, CallResult, ErrorValue, Function, ObjectRef, Promise, Property, Symbol, Tag, Value};
