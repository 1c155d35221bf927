//! Rule data model: kinds, parameters and declared rules.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::FieldRef;

/// The kind of a declared constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Non-zero / non-empty, per field kind
    Required,
    /// Numeric lower bound (inclusive)
    Min,
    /// Numeric upper bound (inclusive)
    Max,
    /// Numeric lower and upper bound (inclusive)
    Range,
    /// Exact value match
    Equal,
    /// Membership in an allowed set
    OneOf,
    /// Minimum length in characters or items
    MinLen,
    /// Maximum length in characters or items
    MaxLen,
    /// Exact length in characters or items
    ExactLen,
    /// Regex pattern match
    Pattern,
    /// Email format
    Email,
    /// URL format
    Url,
    /// No duplicate items in a sequence
    Unique,
    /// Strictly after an instant
    After,
    /// Strictly before an instant
    Before,
    /// Caller-supplied predicate
    Custom,
}

impl RuleKind {
    /// Error code for this rule kind.
    pub fn code(&self) -> &'static str {
        match self {
            RuleKind::Required => "VALIDATION.REQUIRED",
            RuleKind::Min => "VALIDATION.MIN",
            RuleKind::Max => "VALIDATION.MAX",
            RuleKind::Range => "VALIDATION.RANGE",
            RuleKind::Equal => "VALIDATION.EQUAL",
            RuleKind::OneOf => "VALIDATION.ONE_OF",
            RuleKind::MinLen => "VALIDATION.MIN_LEN",
            RuleKind::MaxLen => "VALIDATION.MAX_LEN",
            RuleKind::ExactLen => "VALIDATION.EXACT_LEN",
            RuleKind::Pattern => "VALIDATION.PATTERN",
            RuleKind::Email => "VALIDATION.EMAIL",
            RuleKind::Url => "VALIDATION.URL",
            RuleKind::Unique => "VALIDATION.UNIQUE",
            RuleKind::After => "VALIDATION.AFTER",
            RuleKind::Before => "VALIDATION.BEFORE",
            RuleKind::Custom => "VALIDATION.CUSTOM",
        }
    }
}

/// A rule parameter.
///
/// Parameters stay in the numeric family they were declared in; checkers
/// never convert between families, so an `i64` bound is only ever compared
/// against an integer field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Bool(bool),
    Time(DateTime<Utc>),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Time(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Time(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

pub(crate) type Predicate = Arc<dyn for<'a> Fn(FieldRef<'a>) -> bool + Send + Sync>;

/// A single declared constraint attached to one field.
///
/// Immutable after creation except for the late-bound custom message, which
/// the recorder may set immediately after the rule is appended (the fluent
/// `msg`/`msg_group` pattern).
#[derive(Clone)]
pub struct Rule {
    kind: RuleKind,
    params: Vec<Value>,
    message: Option<String>,
    pattern: Option<Regex>,
    predicate: Option<Predicate>,
}

impl Rule {
    /// Create a rule of the given kind with ordered parameters.
    pub(crate) fn new(kind: RuleKind, params: Vec<Value>) -> Self {
        Self {
            kind,
            params,
            message: None,
            pattern: None,
            predicate: None,
        }
    }

    /// Create a pattern rule, compiling the regex once.
    ///
    /// An uncompilable pattern is kept (compiled form absent) and surfaces as
    /// a per-field error at evaluation time instead of failing registration.
    pub(crate) fn pattern(pattern: &str) -> Self {
        Self {
            kind: RuleKind::Pattern,
            params: vec![Value::Str(pattern.to_string())],
            message: None,
            pattern: Regex::new(pattern).ok(),
            predicate: None,
        }
    }

    /// Create a custom-predicate rule.
    pub(crate) fn custom<F>(check: F) -> Self
    where
        F: for<'a> Fn(FieldRef<'a>) -> bool + Send + Sync + 'static,
    {
        Self {
            kind: RuleKind::Custom,
            params: Vec::new(),
            message: None,
            pattern: None,
            predicate: Some(Arc::new(check)),
        }
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// The custom message, if one was attached.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Error code, derived from the kind.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub(crate) fn set_message(&mut self, message: &str) {
        self.message = Some(message.to_string());
    }

    pub(crate) fn regex(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    pub(crate) fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_distinguish_kinds() {
        assert_eq!(RuleKind::Required.code(), "VALIDATION.REQUIRED");
        assert_eq!(RuleKind::Range.code(), "VALIDATION.RANGE");
        assert_ne!(RuleKind::Required.code(), RuleKind::Range.code());
    }

    #[test]
    fn value_accessors_stay_in_family() {
        assert_eq!(Value::Int(3).as_i64(), Some(3));
        assert_eq!(Value::Int(3).as_u64(), None);
        assert_eq!(Value::Uint(3).as_f64(), None);
        assert_eq!(Value::Str("a".into()).as_str(), Some("a"));
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Int(-5).to_string(), "-5");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Str("abc".into()).to_string(), "abc");
    }

    #[test]
    fn pattern_rule_keeps_invalid_pattern() {
        let rule = Rule::pattern("[unclosed");
        assert!(rule.regex().is_none());
        assert_eq!(rule.params()[0].as_str(), Some("[unclosed"));
    }

    #[test]
    fn message_is_late_bound() {
        let mut rule = Rule::new(RuleKind::Min, vec![Value::Int(1)]);
        assert!(rule.message().is_none());
        rule.set_message("too small");
        assert_eq!(rule.message(), Some("too small"));
    }

    #[test]
    fn rule_kind_serde_roundtrip() {
        let json = serde_json::to_string(&RuleKind::OneOf).unwrap();
        assert_eq!(json, "\"one_of\"");
        let parsed: RuleKind = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, RuleKind::OneOf);
    }
}
