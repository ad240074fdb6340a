//! Scripted behaviors a spy delegates its calls to.

use decoy_compare::serialize;
use decoy_core::{CallResult, ErrorValue, Function, Promise, Thrown, Value};
use std::cell::Cell;
use std::rc::Rc;

/// What a spy does when called
pub(crate) type Behavior = Rc<dyn Fn(&[Value]) -> CallResult>;

/// Returns `undefined`
pub(crate) fn noop() -> Behavior {
    Rc::new(|_: &[Value]| Ok(Value::Undefined))
}

/// Call `fns[0]` first, `fns[1]` second, and repeat the last one afterwards
pub(crate) fn sequence(fns: Vec<Function>) -> Behavior {
    if fns.is_empty() {
        return noop();
    }
    let count = Cell::new(0usize);
    Rc::new(move |args: &[Value]| {
        let index = count.get().min(fns.len() - 1);
        count.set(count.get() + 1);
        fns[index].call(args)
    })
}

/// Return each value in turn, repeating the last
pub(crate) fn returning(values: Vec<Value>) -> Behavior {
    sequence(
        values
            .into_iter()
            .map(|value| Function::new("returns", move |_| Ok(value.clone())))
            .collect(),
    )
}

/// Return a promise fulfilled with each value in turn
pub(crate) fn resolving(values: Vec<Value>) -> Behavior {
    let values = if values.is_empty() {
        vec![Value::Undefined]
    } else {
        values
    };
    sequence(
        values
            .into_iter()
            .map(|value| {
                Function::new("resolves", move |_| {
                    Ok(Value::Promise(Promise::resolved(value.clone())))
                })
            })
            .collect(),
    )
}

/// Return a promise rejected with each reason in turn
pub(crate) fn rejecting(spy_name: &str, reasons: Vec<Value>) -> Behavior {
    let reasons = if reasons.is_empty() {
        vec![Value::Undefined]
    } else {
        reasons
    };
    sequence(
        reasons
            .into_iter()
            .map(|reason| {
                let error = to_error(spy_name, reason);
                Function::new("rejects", move |_| {
                    Ok(Value::Promise(Promise::rejected(Thrown(error.clone()))))
                })
            })
            .collect(),
    )
}

/// Always throw
pub(crate) fn throwing(spy_name: &str, reason: Value) -> Behavior {
    let error = to_error(spy_name, reason);
    Rc::new(move |_: &[Value]| Err(Thrown(error.clone())))
}

/// Errors are kept as they are; anything else becomes the message of a new one
pub(crate) fn to_error(spy_name: &str, reason: Value) -> Value {
    match reason {
        Value::Error(_) => reason,
        Value::Undefined => Value::error(format!("{spy_name} was requested to throw")),
        Value::Str(message) => Value::Error(ErrorValue::new(message)),
        other => Value::error(serialize(&other)),
    }
}
