//! Test outcomes and their classification
//!
//! The runner hands whatever came back from a test invocation to [`classify`]
//! without looking at it. Classification keeps assertion failures ([`Outcome::Fail`])
//! apart from everything else that went wrong ([`Outcome::Error`]).

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tally_core::assertions::{ASSERTION_FAILED_TAG, FAIL_TAG, PASS_MARKER};
use tally_core::Value;

/// What came back from the containment boundary
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// The function returned normally
    Returned(Value),

    /// The function raised an exception
    Raised(Value),

    /// The function panicked, or its worker could not be run
    Crashed(String),

    /// No result within the configured bound
    TimedOut(Duration),
}

/// Classified result of one test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail {
        #[serde(serialize_with = "display")]
        actual: Value,
        #[serde(serialize_with = "display")]
        expected: Value,
    },
    Error {
        #[serde(serialize_with = "display")]
        reason: Value,
        context: String,
    },
}

fn display<S: Serializer>(value: &Value, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

impl Outcome {
    pub fn error(reason: Value, context: impl Into<String>) -> Self {
        Outcome::Error {
            reason,
            context: context.into(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "pass"),
            Outcome::Fail { actual, expected } => write!(f, "fail: expected {}, got {}", expected, actual),
            Outcome::Error { reason, context } => write!(f, "error: {} in {}", reason, context),
        }
    }
}

/// Classify the raw result of invoking `function_name`
pub fn classify(raw: RawResult, function_name: &str) -> Outcome {
    match raw {
        RawResult::Returned(value) => {
            if value.is_atom(PASS_MARKER) {
                return Outcome::Pass;
            }
            match value.tagged(FAIL_TAG) {
                Some([actual, expected]) => Outcome::Fail {
                    actual: actual.clone(),
                    expected: expected.clone(),
                },
                // Completing without a recognizable failure is success
                _ => Outcome::Pass,
            }
        }
        RawResult::Raised(payload) => match payload.tagged(ASSERTION_FAILED_TAG) {
            Some([_kind, actual, expected]) => Outcome::Fail {
                actual: actual.clone(),
                expected: expected.clone(),
            },
            _ => Outcome::error(payload, function_name),
        },
        RawResult::Crashed(message) => Outcome::error(
            Value::tuple([Value::atom("panic"), Value::string(message)]),
            function_name,
        ),
        RawResult::TimedOut(limit) => Outcome::error(
            Value::tuple([
                Value::atom("timeout"),
                Value::Integer(i64::try_from(limit.as_millis()).unwrap_or(i64::MAX)),
            ]),
            function_name,
        ),
    }
}
