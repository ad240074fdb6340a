//! Snapshot serializer hook.
//!
//! An external snapshot mechanism asks every registered plugin whether it
//! recognizes a value (`test`) and lets the first one that does render it
//! (`print`).

use crate::spy::Spy;
use decoy_core::Value;
use std::fmt;
use std::rc::Rc;

/// How a spy renders itself in snapshots
#[derive(Clone)]
pub enum SnapshotFormat {
    /// Fixed text
    Text(String),
    /// Computed from the arguments of the latest call
    Custom(Rc<dyn Fn(&[Value]) -> String>),
}

impl SnapshotFormat {
    /// Fixed text
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Rendering computed from the latest call arguments
    #[must_use]
    pub fn custom<F>(render: F) -> Self
    where
        F: Fn(&[Value]) -> String + 'static,
    {
        Self::Custom(Rc::new(render))
    }

    pub(crate) fn render(&self, latest_args: &[Value]) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Custom(render) => render(latest_args),
        }
    }
}

impl fmt::Debug for SnapshotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Snapshot plugin contract
pub trait SnapshotPlugin {
    /// Whether this plugin renders `value`
    fn test(&self, value: &Value) -> bool;

    /// Render `value`; only called when [`test`](Self::test) accepted it
    fn print(&self, value: &Value) -> String;
}

/// Renders spies as `Spy(<name>)`, `Spy.on(<property>)` or their custom text
#[derive(Debug, Clone, Copy, Default)]
pub struct SpySnapshotSerializer;

impl SnapshotPlugin for SpySnapshotSerializer {
    fn test(&self, value: &Value) -> bool {
        Spy::is_spy(value)
    }

    fn print(&self, value: &Value) -> String {
        match Spy::from_value(value) {
            Some(spy) => spy.snapshot().unwrap_or_else(|| match spy.property() {
                Some(property) => format!("Spy.on({property})"),
                None => format!("Spy({})", spy.name()),
            }),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decoy_compare::serialize_args;
    use decoy_core::{values, ObjectRef};

    #[test]
    fn test_recognizes_only_spies() {
        let plugin = SpySnapshotSerializer;
        let spy = Spy::new("fetch");
        assert!(plugin.test(&spy.as_value()));
        assert!(!plugin.test(&Value::function("f", |_| Ok(Value::Undefined))));
        assert!(!plugin.test(&Value::from(1)));
    }

    #[test]
    fn test_default_renderings() {
        let plugin = SpySnapshotSerializer;
        let spy = Spy::new("fetch");
        assert_eq!(plugin.print(&spy.as_value()), "Spy(fetch)");

        let obj = ObjectRef::new().with("load", Value::function("load", |_| Ok(Value::Undefined)));
        let spy = Spy::on(&obj, "load").unwrap();
        assert_eq!(plugin.print(&obj.get("load").unwrap()), "Spy.on(load)");
        spy.restore().unwrap();
    }

    #[test]
    fn test_custom_rendering_follows_latest_call() {
        let plugin = SpySnapshotSerializer;
        let spy = Spy::new("render");
        spy.add_snapshot_serializer(SnapshotFormat::custom(|args| {
            format!("Render{}", serialize_args(args))
        }));
        assert_eq!(plugin.print(&spy.as_value()), "Render[]");

        spy.call(&values![1, "x"]).unwrap();
        assert_eq!(plugin.print(&spy.as_value()), "Render[1, \"x\"]");

        spy.add_snapshot_serializer(SnapshotFormat::text("<Fixed />"));
        spy.call(&values![2]).unwrap();
        assert_eq!(plugin.print(&spy.as_value()), "<Fixed />");
    }
}
