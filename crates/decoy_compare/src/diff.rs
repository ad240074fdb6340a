//! Equality engine for verifying call arguments.
//!
//! Comparison is lazy: the first differing key wins and the result is the
//! path from the root to that mismatch. Cyclic structures terminate because
//! a left-hand object already being compared further up the current chain
//! is assumed equal.

use crate::serialize::serialize;
use decoy_core::{Matcher, MatcherKind, Thrown, Value};
use std::collections::HashSet;
use std::fmt;

/// One step of a diff path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKey {
    /// Array position
    Index(usize),
    /// Object property
    Key(String),
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Key(k) => f.write_str(k),
        }
    }
}

/// First difference found between two values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    /// Keys from the root to the mismatch
    pub path: Vec<PathKey>,
    /// Why the values at the end of the path differ
    pub reason: String,
    /// Set when a matcher rejected the value, so there is no expected side
    pub from_matcher: bool,
}

impl Difference {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            reason: reason.into(),
            from_matcher: false,
        }
    }

    fn matcher(reason: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            reason: reason.into(),
            from_matcher: true,
        }
    }

    fn under(mut self, key: PathKey) -> Self {
        self.path.insert(0, key);
        self
    }

    /// Render as `--> key / key / reason`
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("-->");
        for key in &self.path {
            out.push(' ');
            out.push_str(&key.to_string());
            out.push_str(" /");
        }
        out.push(' ');
        out.push_str(&self.reason);
        out
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Deep structural comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualityEngine {
    use_own_equals: bool,
}

impl EqualityEngine {
    /// Create an engine
    ///
    /// With `use_own_equals`, objects exposing a callable `equals` member are
    /// compared by calling it instead of recursing into their keys.
    #[must_use]
    pub fn new(use_own_equals: bool) -> Self {
        Self { use_own_equals }
    }

    /// Whether own `equals` members are consulted
    #[must_use]
    pub fn uses_own_equals(&self) -> bool {
        self.use_own_equals
    }

    /// Compute the first difference between `a` and `b`
    ///
    /// # Errors
    ///
    /// Returns the thrown value if an own `equals` method throws
    pub fn diff(&self, a: &Value, b: &Value) -> Result<Option<Difference>, Thrown> {
        let mut visiting = HashSet::new();
        self.diff_values(a, b, &mut visiting)
    }

    /// Compare an actual argument list against an expected one
    ///
    /// # Errors
    ///
    /// Returns the thrown value if an own `equals` method throws
    pub fn diff_args(&self, actual: &[Value], expected: &[Value]) -> Result<Option<Difference>, Thrown> {
        self.diff(&Value::array(actual.to_vec()), &Value::array(expected.to_vec()))
    }

    /// Render the difference between `a` and `b` for diagnostics
    ///
    /// When both sides exist at the mismatch, the differing sub-values are
    /// appended as `[actual != expected]`.
    ///
    /// # Errors
    ///
    /// Returns the thrown value if an own `equals` method throws
    pub fn difference_of(&self, a: &Value, b: &Value) -> Result<Option<String>, Thrown> {
        let Some(diff) = self.diff(a, b)? else {
            return Ok(None);
        };
        let mut text = diff.render();
        if !diff.from_matcher {
            let actual = walk(a, &diff.path);
            let expected = walk(b, &diff.path);
            text.push_str(&format!(" [{} != {}]", serialize(&actual), serialize(&expected)));
        }
        Ok(Some(text))
    }

    /// [`difference_of`](Self::difference_of) over argument lists
    ///
    /// # Errors
    ///
    /// Returns the thrown value if an own `equals` method throws
    pub fn difference_of_args(&self, actual: &[Value], expected: &[Value]) -> Result<Option<String>, Thrown> {
        self.difference_of(&Value::array(actual.to_vec()), &Value::array(expected.to_vec()))
    }

    fn diff_values(
        &self,
        a: &Value,
        b: &Value,
        visiting: &mut HashSet<usize>,
    ) -> Result<Option<Difference>, Thrown> {
        if a.strict_equals(b) {
            return Ok(None);
        }
        if matches!(a, Value::Ignore) || matches!(b, Value::Ignore) {
            return Ok(None);
        }
        if let Value::Matcher(matcher) = a {
            return self.run_matcher(matcher, b, visiting);
        }
        if let Value::Matcher(matcher) = b {
            return self.run_matcher(matcher, a, visiting);
        }
        if a.is_undefined() || b.is_undefined() {
            return Ok(Some(Difference::new("one was undefined")));
        }
        if a.is_null() || b.is_null() {
            return Ok(Some(Difference::new("one was null")));
        }

        let (tag_a, tag_b) = (a.tag(), b.tag());
        if tag_a != tag_b {
            return Ok(Some(Difference::new(format!(
                "different type ({tag_a} != {tag_b})"
            ))));
        }

        let reason = match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                (!(x.is_nan() && y.is_nan()) && x != y).then_some("different number")
            }
            (Value::Str(_), Value::Str(_)) => Some("different string"),
            (Value::Bool(_), Value::Bool(_)) => Some("different bool"),
            (Value::BigInt(_), Value::BigInt(_)) => Some("different bigint"),
            (Value::Date(x), Value::Date(y)) => (x != y).then_some("different date"),
            (Value::RegExp(x), Value::RegExp(y)) => (x != y).then_some("different regexp"),
            (Value::Symbol(_), Value::Symbol(_)) => Some("different symbol"),
            (Value::Function(_), Value::Function(_)) => Some("different function"),
            (Value::Promise(_), Value::Promise(_)) => Some("different promise"),
            (Value::Error(x), Value::Error(y)) => {
                (x.name() != y.name() || x.message() != y.message()).then_some("different error")
            }
            _ => return self.diff_composite(a, b, visiting),
        };
        Ok(reason.map(Difference::new))
    }

    fn diff_composite(
        &self,
        a: &Value,
        b: &Value,
        visiting: &mut HashSet<usize>,
    ) -> Result<Option<Difference>, Thrown> {
        let keys: Vec<PathKey> = match (a, b) {
            (Value::Array(x), Value::Array(y)) => {
                if visiting.contains(&x.addr()) {
                    return Ok(None);
                }
                (0..x.len().max(y.len())).map(PathKey::Index).collect()
            }
            (Value::Object(x), Value::Object(y)) => {
                if visiting.contains(&x.addr()) {
                    return Ok(None);
                }
                let class_a = x.class_name().unwrap_or_else(|| "Object".to_string());
                let class_b = y.class_name().unwrap_or_else(|| "Object".to_string());
                if class_a != class_b {
                    return Ok(Some(Difference::new(format!(
                        "different constructor ({class_a} != {class_b})"
                    ))));
                }
                if self.use_own_equals {
                    if let Some(Value::Function(equals)) = x.get("equals") {
                        tracing::trace!(class = %class_a, "delegating to own equals");
                        let verdict = equals.call(&[a.clone(), b.clone()])?;
                        return Ok((!verdict.is_truthy())
                            .then(|| Difference::new("own equals method failed")));
                    }
                }
                let mut keys = x.own_keys();
                for key in y.own_keys() {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                keys.into_iter().map(PathKey::Key).collect()
            }
            _ => return Ok(Some(Difference::new(format!("different {}", a.tag())))),
        };

        let addr = match a {
            Value::Array(x) => x.addr(),
            Value::Object(x) => x.addr(),
            _ => 0,
        };
        visiting.insert(addr);
        for key in keys {
            let name = key.to_string();
            let (left, right) = (a.member(&name), b.member(&name));
            if let Some(diff) = self.diff_values(&left, &right, visiting)? {
                visiting.remove(&addr);
                return Ok(Some(diff.under(key)));
            }
        }
        visiting.remove(&addr);
        Ok(None)
    }

    fn run_matcher(
        &self,
        matcher: &Matcher,
        value: &Value,
        visiting: &mut HashSet<usize>,
    ) -> Result<Option<Difference>, Thrown> {
        match matcher.kind() {
            MatcherKind::Compare(predicate) => Ok(match predicate(value) {
                Ok(true) => None,
                Ok(false) => Some(Difference::matcher("custom comparison failed")),
                Err(err) => Some(Difference::matcher(format!(
                    "custom comparison failed: {}",
                    format!("{err:#}").trim()
                ))),
            }),
            MatcherKind::Mapper { args, expected } => {
                let Value::Function(func) = value else {
                    return Ok(Some(Difference::matcher(format!(
                        "mapper expected a function but got {}",
                        value.tag()
                    ))));
                };
                match func.call(args) {
                    Ok(result) => Ok(self
                        .diff_values(&result, expected, visiting)?
                        .map(|inner| {
                            Difference::matcher(format!("mapper returned an unexpected value {}", inner.render()))
                        })),
                    Err(thrown) => Ok(Some(Difference::matcher(format!("mapper threw {thrown}")))),
                }
            }
        }
    }
}

impl Default for EqualityEngine {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Compute the first difference between `a` and `b`
///
/// # Errors
///
/// Returns the thrown value if an own `equals` method throws
pub fn diff(a: &Value, b: &Value, use_own_equals: bool) -> Result<Option<Difference>, Thrown> {
    EqualityEngine::new(use_own_equals).diff(a, b)
}

/// Render the difference between `a` and `b`, `None` when they match
///
/// # Errors
///
/// Returns the thrown value if an own `equals` method throws
pub fn difference_of(a: &Value, b: &Value, use_own_equals: bool) -> Result<Option<String>, Thrown> {
    EqualityEngine::new(use_own_equals).difference_of(a, b)
}

fn walk(root: &Value, path: &[PathKey]) -> Value {
    path.iter()
        .fold(root.clone(), |value, key| value.member(&key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use decoy_core::{values, ErrorValue, ObjectRef};
    use proptest::prelude::*;

    fn engine() -> EqualityEngine {
        EqualityEngine::default()
    }

    #[test]
    fn test_identical_values() {
        let obj = Value::object([("a", Value::from(1))]);
        assert!(engine().diff(&obj, &obj).unwrap().is_none());
        assert!(engine().diff(&Value::from("x"), &Value::from("x")).unwrap().is_none());
    }

    #[test]
    fn test_undefined_and_null() {
        let d = engine().diff(&Value::Undefined, &Value::from(1)).unwrap().unwrap();
        assert_eq!(d.reason, "one was undefined");
        let d = engine().diff(&Value::from(1), &Value::Undefined).unwrap().unwrap();
        assert_eq!(d.reason, "one was undefined");
        let d = engine().diff(&Value::Null, &Value::from("a")).unwrap().unwrap();
        assert_eq!(d.reason, "one was null");
    }

    #[test]
    fn test_type_mismatch() {
        let d = engine().diff(&Value::from("1"), &Value::from(1)).unwrap().unwrap();
        assert_eq!(d.reason, "different type (string != number)");
    }

    #[test]
    fn test_nan_equals_nan() {
        let nan = Value::Number(f64::NAN);
        assert!(engine().diff(&nan, &Value::Number(f64::NAN)).unwrap().is_none());
        assert!(engine().diff(&nan, &Value::from(1)).unwrap().is_some());
    }

    #[test]
    fn test_dates_and_regexps() {
        assert!(engine().diff(&Value::date(5), &Value::date(5)).unwrap().is_none());
        assert!(engine().diff(&Value::date(5), &Value::date(6)).unwrap().is_some());
        assert!(engine().diff(&Value::regexp("/a/g"), &Value::regexp("/a/g")).unwrap().is_none());
        assert!(engine().diff(&Value::regexp("/a/g"), &Value::regexp("/a/")).unwrap().is_some());
    }

    #[test]
    fn test_functions_compare_by_reference() {
        let f = Value::function("f", |_| Ok(Value::Undefined));
        let g = Value::function("f", |_| Ok(Value::Undefined));
        assert!(engine().diff(&f, &f.clone()).unwrap().is_none());
        let d = engine().diff(&f, &g).unwrap().unwrap();
        assert_eq!(d.reason, "different function");
    }

    #[test]
    fn test_errors_compare_by_name_and_message() {
        let a = Value::error("x");
        assert!(engine().diff(&a, &Value::error("x")).unwrap().is_none());
        assert!(engine().diff(&a, &Value::error("y")).unwrap().is_some());
        let typed = Value::Error(ErrorValue::with_name("TypeError", "x"));
        assert!(engine().diff(&a, &typed).unwrap().is_some());
    }

    #[test]
    fn test_nested_path() {
        let a = Value::object([("outer", Value::object([("inner", Value::array(values![1, 2]))]))]);
        let b = Value::object([("outer", Value::object([("inner", Value::array(values![1, 3]))]))]);
        let d = engine().diff(&a, &b).unwrap().unwrap();
        assert_eq!(
            d.path,
            vec![
                PathKey::Key("outer".to_string()),
                PathKey::Key("inner".to_string()),
                PathKey::Index(1)
            ]
        );
        assert_eq!(d.render(), "--> outer / inner / 1 / different number");
    }

    #[test]
    fn test_first_difference_wins() {
        let a = Value::array(values![1, "a", true]);
        let b = Value::array(values![2, "b", false]);
        let d = engine().diff(&a, &b).unwrap().unwrap();
        assert_eq!(d.path, vec![PathKey::Index(0)]);
    }

    #[test]
    fn test_missing_key_is_undefined() {
        let a = Value::object([("a", Value::from(1))]);
        let b = Value::object([("a", Value::from(1)), ("b", Value::from(2))]);
        let d = engine().diff(&a, &b).unwrap().unwrap();
        assert_eq!(d.render(), "--> b / one was undefined");

        let shorter = Value::array(values![1]);
        let longer = Value::array(values![1, 2]);
        assert!(engine().diff(&shorter, &longer).unwrap().is_some());
    }

    #[test]
    fn test_explicit_undefined_equals_missing_key() {
        let a = Value::object([("a", Value::Undefined)]);
        let b = Value::object::<&str, _>([]);
        assert!(engine().diff(&a, &b).unwrap().is_none());
    }

    #[test]
    fn test_constructor_mismatch() {
        let a = Value::Object(ObjectRef::new().with_class("Money").with("amount", 1));
        let b = Value::object([("amount", Value::from(1))]);
        let d = engine().diff(&a, &b).unwrap().unwrap();
        assert_eq!(d.reason, "different constructor (Money != Object)");
    }

    #[test]
    fn test_own_equals() {
        let proto = ObjectRef::new().with(
            "equals",
            Value::function("equals", |args| {
                let left = args[0].member("amount").as_number();
                let right = args[1].member("amount").as_number();
                Ok(Value::Bool(left == right))
            }),
        );
        let money = |amount: i32, note: &str| {
            Value::Object(
                ObjectRef::new()
                    .with_class("Money")
                    .with_prototype(proto.clone())
                    .with("amount", amount)
                    .with("note", note),
            )
        };

        // notes differ but equals only looks at the amount
        assert!(engine().diff(&money(1, "a"), &money(1, "b")).unwrap().is_none());
        let d = engine().diff(&money(1, "a"), &money(2, "a")).unwrap().unwrap();
        assert_eq!(d.reason, "own equals method failed");

        // structural comparison when disabled
        let structural = EqualityEngine::new(false);
        assert!(structural.diff(&money(1, "a"), &money(1, "b")).unwrap().is_some());
    }

    #[test]
    fn test_own_equals_throwing_propagates() {
        let obj = Value::Object(
            ObjectRef::new().with("equals", Value::function("equals", |_| Err(Thrown::error("bad equals")))),
        );
        let other = Value::object::<&str, _>([]);
        let result = engine().diff(&obj, &other);
        assert_eq!(result.unwrap_err().message().as_deref(), Some("bad equals"));
    }

    #[test]
    fn test_wildcard_anywhere() {
        let a = Value::object([("a", Value::array(values![1, "x"]))]);
        let b = Value::object([("a", Value::array(vec![Value::from(1), Value::Ignore]))]);
        assert!(engine().diff(&a, &b).unwrap().is_none());
        assert!(engine().diff(&Value::Ignore, &a).unwrap().is_none());
    }

    #[test]
    fn test_compare_matcher() {
        let positive = Value::compare(|v| Ok(v.as_number().is_some_and(|n| n > 0.0)));
        assert!(engine().diff(&Value::from(3), &positive).unwrap().is_none());
        let d = engine().diff(&Value::from(-3), &positive).unwrap().unwrap();
        assert!(d.from_matcher);
        assert_eq!(d.reason, "custom comparison failed");
    }

    #[test]
    fn test_compare_matcher_error_becomes_diff() {
        let failing = Value::compare(|_| Err(anyhow::anyhow!("nested assertion failed")));
        let d = engine().diff(&Value::from(1), &failing).unwrap().unwrap();
        assert_eq!(d.reason, "custom comparison failed: nested assertion failed");
    }

    #[test]
    fn test_mapper_matcher() {
        let double = Value::function("double", |args| {
            Ok(Value::Number(args[0].as_number().unwrap_or(0.0) * 2.0))
        });
        let expect_four = Value::mapper(values![2], 4);
        assert!(engine().diff(&double, &expect_four).unwrap().is_none());

        let expect_five = Value::mapper(values![2], 5);
        let d = engine().diff(&double, &expect_five).unwrap().unwrap();
        assert!(d.from_matcher);
        assert!(d.reason.starts_with("mapper returned an unexpected value"));

        let d = engine().diff(&Value::from(1), &expect_four).unwrap().unwrap();
        assert_eq!(d.reason, "mapper expected a function but got number");
    }

    #[test]
    fn test_cyclic_structures() {
        let a = ObjectRef::new().with("name", "a");
        a.set("self", a.clone()).unwrap();
        let b = ObjectRef::new().with("name", "a");
        b.set("self", b.clone()).unwrap();
        assert!(engine().diff(&Value::Object(a.clone()), &Value::Object(b.clone())).unwrap().is_none());

        let c = ObjectRef::new().with("name", "c");
        c.set("self", c.clone()).unwrap();
        let d = engine().diff(&Value::Object(a), &Value::Object(c)).unwrap().unwrap();
        assert_eq!(d.render(), "--> name / different string");
    }

    #[test]
    fn test_repeated_non_cyclic_references_are_compared() {
        let shared = Value::object([("v", Value::from(1))]);
        let a = Value::array(vec![shared.clone(), shared]);
        let b = Value::array(vec![
            Value::object([("v", Value::from(1))]),
            Value::object([("v", Value::from(2))]),
        ]);
        let d = engine().diff(&a, &b).unwrap().unwrap();
        assert_eq!(d.render(), "--> 1 / v / different number");
    }

    #[test]
    fn test_difference_of_renders_sub_values() {
        let a = Value::array(values![1, "a"]);
        let b = Value::array(values![1, "b"]);
        let text = difference_of(&a, &b, true).unwrap().unwrap();
        assert_eq!(text, "--> 1 / different string [\"a\" != \"b\"]");
        assert!(difference_of(&a, &a, true).unwrap().is_none());
    }

    #[test]
    fn test_difference_of_skips_sub_values_for_matchers() {
        let never = Value::compare(|_| Ok(false));
        let text = difference_of(&Value::from(1), &never, true).unwrap().unwrap();
        assert_eq!(text, "--> custom comparison failed");
    }

    #[test]
    fn test_diff_args() {
        let d = engine().diff_args(&values![1, "a"], &values![1, "b"]).unwrap().unwrap();
        assert_eq!(d.path, vec![PathKey::Index(1)]);
        assert!(engine().diff_args(&values![], &values![]).unwrap().is_none());
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Undefined),
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<f64>().prop_map(Value::Number),
            any::<i64>().prop_map(Value::Date),
            "[a-z]{0,8}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::array),
                prop::collection::vec(("[a-z]{1,4}", inner), 0..4).prop_map(Value::object),
            ]
        })
    }

    fn deep_copy(value: &Value) -> Value {
        match value {
            Value::Array(arr) => Value::array(arr.to_vec().iter().map(deep_copy).collect()),
            Value::Object(obj) => Value::object(
                obj.own_keys()
                    .into_iter()
                    .map(|k| {
                        let v = obj.get_own(&k).unwrap_or_default();
                        (k, deep_copy(&v))
                    })
                    .collect::<Vec<_>>(),
            ),
            other => other.clone(),
        }
    }

    proptest! {
        #[test]
        fn prop_diff_reflexive(value in arb_value()) {
            prop_assert!(engine().diff(&value, &value).unwrap().is_none());
            prop_assert!(engine().diff(&value, &deep_copy(&value)).unwrap().is_none());
        }

        #[test]
        fn prop_wildcard_matches_anything(value in arb_value()) {
            prop_assert!(engine().diff(&value, &Value::Ignore).unwrap().is_none());
            prop_assert!(engine().diff(&Value::Ignore, &value).unwrap().is_none());
            let wrapped = Value::object([("k", value)]);
            let pattern = Value::object([("k", Value::Ignore)]);
            prop_assert!(engine().diff(&wrapped, &pattern).unwrap().is_none());
        }
    }
}
