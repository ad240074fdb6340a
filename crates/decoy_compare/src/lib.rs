//! DECOY Compare
//!
//! Deep equality for call-argument verification and the serializer used in
//! every diagnostic message.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
pub mod serialize;

pub use diff::{diff, difference_of, Difference, EqualityEngine, PathKey};
pub use serialize::{format_number, serialize, serialize_args, CYCLIC_TOKEN, FUNCTION_TOKEN, IGNORED_TOKEN};
