//! Comparator wrappers for argument verification.

use crate::value::Value;
use std::rc::Rc;

/// User predicate consulted in place of structural comparison
///
/// Returning `Ok(false)` or an error both count as a mismatch. Errors let a
/// predicate run nested assertions with `?`.
pub type Predicate = dyn Fn(&Value) -> anyhow::Result<bool>;

/// What a matcher checks
pub enum MatcherKind {
    /// Pass the compared value through a predicate
    Compare(Box<Predicate>),
    /// Call the compared value with `args` and compare the result to `expected`
    Mapper {
        /// Arguments passed to the compared function
        args: Vec<Value>,
        /// Expected return value
        expected: Value,
    },
}

/// Comparator wrapper value
#[derive(Clone)]
pub struct Matcher(Rc<MatcherKind>);

impl Matcher {
    /// Wrap a predicate
    #[must_use]
    pub fn compare<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<bool> + 'static,
    {
        Self(Rc::new(MatcherKind::Compare(Box::new(predicate))))
    }

    /// Wrap a mapping expectation
    #[must_use]
    pub fn mapper(args: Vec<Value>, expected: Value) -> Self {
        Self(Rc::new(MatcherKind::Mapper { args, expected }))
    }

    /// Matcher kind
    #[must_use]
    pub fn kind(&self) -> &MatcherKind {
        &self.0
    }

    /// Identity comparison
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_predicate_runs() {
        let matcher = Matcher::compare(|v| Ok(v.as_number() == Some(3.0)));
        match matcher.kind() {
            MatcherKind::Compare(pred) => {
                assert!(pred(&Value::from(3)).unwrap());
                assert!(!pred(&Value::from(4)).unwrap());
            }
            MatcherKind::Mapper { .. } => panic!("expected compare matcher"),
        }
    }

    #[test]
    fn test_mapper_holds_expectation() {
        let matcher = Matcher::mapper(vec![Value::from(1)], Value::from(2));
        match matcher.kind() {
            MatcherKind::Mapper { args, expected } => {
                assert_eq!(args.len(), 1);
                assert_eq!(expected.as_number(), Some(2.0));
            }
            MatcherKind::Compare(_) => panic!("expected mapper"),
        }
    }

    #[test]
    fn test_matcher_identity() {
        let a = Matcher::mapper(vec![], Value::Undefined);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Matcher::mapper(vec![], Value::Undefined)));
    }
}
