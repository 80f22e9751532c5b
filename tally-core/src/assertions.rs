//! Assertion library
//!
//! Two parallel families over [`Value`]:
//!
//! - the tuple-returning family (`assert_equal`, ...) never raises. It returns
//!   the pass marker (the atom `pass`) or the failure marker
//!   `{fail, Actual, Expected}`.
//! - the raising family (`assert_equal_or_raise`, ...) returns
//!   `Result<Value, AssertionFailure>`. A runtime turns the error into the raised
//!   payload `{assertion_failed, Kind, Actual, Expected}` via
//!   [`AssertionFailure::into_payload`].

use std::fmt;

use crate::value::Value;

/// Atom returned by the tuple-returning family on success
pub const PASS_MARKER: &str = "pass";

/// Tag of the tuple-returning family's failure marker
pub const FAIL_TAG: &str = "fail";

/// Tag of the payload raised by the raising family
pub const ASSERTION_FAILED_TAG: &str = "assertion_failed";

/// Wildcard atom accepted by [`assert_match`] patterns
pub const WILDCARD: &str = "_";

/// Which assertion produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssertionKind {
    Equal,
    NotEqual,
    True,
    False,
    Match,
}

impl AssertionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AssertionKind::Equal => "assert_equal",
            AssertionKind::NotEqual => "assert_not_equal",
            AssertionKind::True => "assert_true",
            AssertionKind::False => "assert_false",
            AssertionKind::Match => "assert_match",
        }
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mismatch reported by the raising family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    pub kind: AssertionKind,
    pub actual: Value,
    pub expected: Value,
}

impl AssertionFailure {
    /// `{assertion_failed, Kind, Actual, Expected}`
    pub fn into_payload(self) -> Value {
        Value::tuple([
            Value::atom(ASSERTION_FAILED_TAG),
            Value::atom(self.kind.as_str()),
            self.actual,
            self.expected,
        ])
    }

    /// `{fail, Actual, Expected}`
    pub fn into_marker(self) -> Value {
        fail_marker(self.actual, self.expected)
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: expected {}, got {}", self.kind, self.expected, self.actual)
    }
}

impl std::error::Error for AssertionFailure {}

pub type AssertionResult = Result<Value, AssertionFailure>;

pub fn pass_marker() -> Value {
    Value::atom(PASS_MARKER)
}

pub fn fail_marker(actual: Value, expected: Value) -> Value {
    Value::tuple([Value::atom(FAIL_TAG), actual, expected])
}

fn check(kind: AssertionKind, ok: bool, actual: &Value, expected: Value) -> AssertionResult {
    if ok {
        Ok(pass_marker())
    } else {
        Err(AssertionFailure {
            kind,
            actual: actual.clone(),
            expected,
        })
    }
}

fn collapse(result: AssertionResult) -> Value {
    result.unwrap_or_else(AssertionFailure::into_marker)
}

/// Does `value` match `pattern`?
///
/// The atom `_` matches anything. Tuples and lists match element-wise and must
/// have the same length. A map pattern only constrains the keys it names.
pub fn matches_pattern(value: &Value, pattern: &Value) -> bool {
    match (pattern, value) {
        (Value::Atom(a), _) if a == WILDCARD => true,
        (Value::Tuple(ps), Value::Tuple(vs)) | (Value::List(ps), Value::List(vs)) => {
            ps.len() == vs.len() && ps.iter().zip(vs).all(|(p, v)| matches_pattern(v, p))
        }
        (Value::Map(ps), Value::Map(vs)) => ps
            .iter()
            .all(|(key, p)| vs.get(key).is_some_and(|v| matches_pattern(v, p))),
        _ => value == pattern,
    }
}

// Raising family

pub fn assert_equal_or_raise(actual: &Value, expected: &Value) -> AssertionResult {
    check(AssertionKind::Equal, actual == expected, actual, expected.clone())
}

pub fn assert_not_equal_or_raise(actual: &Value, expected: &Value) -> AssertionResult {
    check(
        AssertionKind::NotEqual,
        actual != expected,
        actual,
        Value::tuple([Value::atom("not"), expected.clone()]),
    )
}

pub fn assert_true_or_raise(value: &Value) -> AssertionResult {
    check(AssertionKind::True, value.is_true(), value, Value::bool(true))
}

pub fn assert_false_or_raise(value: &Value) -> AssertionResult {
    check(AssertionKind::False, value.is_false(), value, Value::bool(false))
}

pub fn assert_match_or_raise(value: &Value, pattern: &Value) -> AssertionResult {
    check(AssertionKind::Match, matches_pattern(value, pattern), value, pattern.clone())
}

// Tuple-returning family

pub fn assert_equal(actual: &Value, expected: &Value) -> Value {
    collapse(assert_equal_or_raise(actual, expected))
}

pub fn assert_not_equal(actual: &Value, expected: &Value) -> Value {
    collapse(assert_not_equal_or_raise(actual, expected))
}

pub fn assert_true(value: &Value) -> Value {
    collapse(assert_true_or_raise(value))
}

pub fn assert_false(value: &Value) -> Value {
    collapse(assert_false_or_raise(value))
}

pub fn assert_match(value: &Value, pattern: &Value) -> Value {
    collapse(assert_match_or_raise(value, pattern))
}
