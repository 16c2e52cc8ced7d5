//! Comparison of an actual metadata value against the expected one
//!
//! Dispatch is on the type of the actual value:
//! - strings: equality, or regex search with `regex`
//! - numbers: one of ==, >, <, >=, <=
//! - booleans: equality
//!
//! The expected side is either a literal from the command line, parsed
//! according to the actual type, or a value fetched from metadata which must
//! have the same type as the actual one.

use crate::status::{CheckResult, CheckStatus};
use crate::value::MetaValue;
use regex::Regex;

/// Comparison settings for one check
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Metadata key, used in messages
    pub key: String,
    /// Treat the expected string as a regular expression
    pub regex: bool,
    pub gt: bool,
    pub lt: bool,
    pub ge: bool,
    pub le: bool,
}

impl CompareOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Selected numeric operator, `None` if more than one flag is set
    pub fn number_operator(&self) -> Option<NumberOperator> {
        let selected: Vec<NumberOperator> = [
            (self.gt, NumberOperator::Gt),
            (self.lt, NumberOperator::Lt),
            (self.ge, NumberOperator::Ge),
            (self.le, NumberOperator::Le),
        ]
        .into_iter()
        .filter_map(|(set, op)| set.then_some(op))
        .collect();

        match selected.as_slice() {
            [] => Some(NumberOperator::Eq),
            [op] => Some(*op),
            _ => None,
        }
    }
}

/// Numeric comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberOperator {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl NumberOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            NumberOperator::Eq => "==",
            NumberOperator::Gt => ">",
            NumberOperator::Lt => "<",
            NumberOperator::Ge => ">=",
            NumberOperator::Le => "<=",
        }
    }

    /// Whether `actual <op> expected` holds
    pub fn holds(self, actual: f64, expected: f64) -> bool {
        match self {
            NumberOperator::Eq => actual == expected,
            NumberOperator::Gt => actual > expected,
            NumberOperator::Lt => actual < expected,
            NumberOperator::Ge => actual >= expected,
            NumberOperator::Le => actual <= expected,
        }
    }
}

/// Where the expected value comes from
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// Literal given on the command line, parsed per the actual type
    Literal(String),
    /// Value fetched from metadata (live or cached)
    Value(MetaValue),
}

/// Compare `actual` against `expected`
pub fn check_value(
    actual: &MetaValue,
    expected: &Expectation,
    options: &CompareOptions,
) -> CheckResult {
    match actual {
        MetaValue::String(s) => check_string(s, expected, options),
        MetaValue::Number(n) => match options.number_operator() {
            Some(op) => check_number(*n, op, expected, options),
            None => CheckResult::unknown("only one of --gt, --lt, --ge and --le can be specified"),
        },
        MetaValue::Bool(b) => check_bool(*b, expected, options),
        MetaValue::Absent => CheckResult::unknown(format!(
            "unsupported type value: type={}, value={}",
            actual.type_name(),
            actual
        )),
    }
}

fn type_mismatch(actual: &'static str, expected: &MetaValue) -> CheckResult {
    CheckResult::unknown(format!(
        "unmatched compare type: actual={}, expected={}",
        actual,
        expected.type_name()
    ))
}

fn outcome(matched: bool) -> (&'static str, CheckStatus) {
    if matched {
        ("matched", CheckStatus::Ok)
    } else {
        ("did not match", CheckStatus::Critical)
    }
}

fn check_string(actual: &str, expected: &Expectation, options: &CompareOptions) -> CheckResult {
    let expected = match expected {
        Expectation::Literal(s) => s.as_str(),
        Expectation::Value(MetaValue::String(s)) => s.as_str(),
        Expectation::Value(other) => return type_mismatch("string", other),
    };

    let (kind, matched) = if options.regex {
        let re = match Regex::new(expected) {
            Ok(re) => re,
            // Syntax errors span several lines; the report must be one
            Err(e) => return CheckResult::unknown(e.to_string().replace('\n', " ")),
        };
        ("regex string", re.is_match(actual))
    } else {
        ("string", actual == expected)
    };

    let (reason, status) = outcome(matched);
    CheckResult::new(
        status,
        format!(
            "{} {}: key={}, actual={}, expected={}",
            kind, reason, options.key, actual, expected
        ),
    )
}

fn check_number(
    actual: f64,
    op: NumberOperator,
    expected: &Expectation,
    options: &CompareOptions,
) -> CheckResult {
    let expected = match expected {
        Expectation::Literal(s) => match s.trim().parse::<f64>() {
            Ok(n) => n,
            Err(e) => {
                return CheckResult::unknown(format!(
                    "failed to parse expected value {:?} as a number: {}",
                    s, e
                ))
            }
        },
        Expectation::Value(MetaValue::Number(n)) => *n,
        Expectation::Value(other) => return type_mismatch("number", other),
    };

    let (reason, status) = outcome(op.holds(actual, expected));
    CheckResult::new(
        status,
        format!(
            "number value {}: key={}, actual({}) {} expected({})",
            reason,
            options.key,
            actual,
            op.symbol(),
            expected
        ),
    )
}

fn check_bool(actual: bool, expected: &Expectation, options: &CompareOptions) -> CheckResult {
    let expected = match expected {
        Expectation::Literal(s) => match parse_bool(s) {
            Some(b) => b,
            None => {
                return CheckResult::unknown(format!(
                    "failed to parse expected value {:?} as a boolean",
                    s
                ))
            }
        },
        Expectation::Value(MetaValue::Bool(b)) => *b,
        Expectation::Value(other) => return type_mismatch("boolean", other),
    };

    let (reason, status) = outcome(actual == expected);
    CheckResult::new(
        status,
        format!(
            "boolean value {}: key={}, actual={}, expected={}",
            reason, options.key, actual, expected
        ),
    )
}

/// Boolean literals accepted for the expected value
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
