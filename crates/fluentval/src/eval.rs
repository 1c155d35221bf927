//! The evaluator: runs a compiled schema against a live instance.
//!
//! Field plans are walked in ascending slot order and each field's rules in
//! declaration order; both orderings are part of the observable contract.
//! Checkers are split per field kind — the numeric families never share a
//! path, so an `i64` bound is never coerced through a float comparison.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::{ValidationError, ValidationErrors};
use crate::fields::Sequence;
use crate::rule::{Rule, RuleKind, Value};
use crate::schema::{FieldKind, FieldRef, Schema};

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
static URL_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        // RFC 5322 simplified email regex
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
        ).unwrap()
    })
}

fn url_regex() -> &'static Regex {
    URL_REGEX.get_or_init(|| Regex::new(r"^(https?|ftp)://[^\s/$.?#].[^\s]*$").unwrap())
}

/// Validate `instance` against `schema`.
///
/// Returns the accumulated errors, or just the first one when the schema is
/// fail-fast.
pub(crate) fn run<Root>(schema: &Schema<Root>, instance: &Root) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for plan in schema.plans() {
        let value = (*plan.read)(instance);
        for rule in &plan.rules {
            if let Some(default_message) = check(value, rule) {
                let message = rule
                    .message()
                    .map(str::to_string)
                    .unwrap_or(default_message);
                errors.push(ValidationError::new(plan.name.clone(), rule.code(), message));
                if schema.fail_fast() {
                    return errors;
                }
            }
        }
    }
    errors
}

/// Check one rule against one field value. Returns the default failure
/// message, or `None` on pass.
fn check(value: FieldRef<'_>, rule: &Rule) -> Option<String> {
    if let Some(predicate) = rule.predicate() {
        return if (**predicate)(value) {
            None
        } else {
            Some("Value is not acceptable".to_string())
        };
    }

    match value {
        FieldRef::Int(v) => check_int(v, rule),
        FieldRef::Uint(v) => check_uint(v, rule),
        FieldRef::Float(v) => check_float(v, rule),
        FieldRef::Str(v) => check_str(v, rule),
        FieldRef::Bool(v) => check_bool(v, rule),
        FieldRef::Seq(v) => check_seq(v, rule),
        FieldRef::Time(v) => check_time(v, rule),
    }
}

/// A rule kind that does not apply to this field kind (or whose parameters
/// are missing) produces a descriptive error instead of aborting the run.
fn inapplicable(rule: &Rule, kind: FieldKind) -> Option<String> {
    Some(format!(
        "Rule {} does not apply to {} fields",
        rule.code(),
        kind.name()
    ))
}

fn one_of_message(rule: &Rule) -> String {
    let allowed: Vec<String> = rule.params().iter().map(Value::to_string).collect();
    format!("Value must be one of: {}", allowed.join(", "))
}

fn check_int(value: i64, rule: &Rule) -> Option<String> {
    match rule.kind() {
        RuleKind::Required => (value == 0).then(|| "This field is required".to_string()),
        RuleKind::Min => match rule.params().first().and_then(Value::as_i64) {
            Some(min) if value < min => Some(format!("Value must be at least {min}")),
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Int),
        },
        RuleKind::Max => match rule.params().first().and_then(Value::as_i64) {
            Some(max) if value > max => Some(format!("Value must be at most {max}")),
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Int),
        },
        RuleKind::Range => {
            let min = rule.params().first().and_then(Value::as_i64);
            let max = rule.params().get(1).and_then(Value::as_i64);
            match (min, max) {
                (Some(min), Some(max)) if value < min || value > max => {
                    Some(format!("Value must be between {min} and {max}"))
                }
                (Some(_), Some(_)) => None,
                _ => inapplicable(rule, FieldKind::Int),
            }
        }
        RuleKind::Equal => match rule.params().first().and_then(Value::as_i64) {
            Some(expected) if value != expected => Some(format!("Value must equal {expected}")),
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Int),
        },
        RuleKind::OneOf => rule
            .params()
            .iter()
            .all(|p| p.as_i64() != Some(value))
            .then(|| one_of_message(rule)),
        _ => inapplicable(rule, FieldKind::Int),
    }
}

fn check_uint(value: u64, rule: &Rule) -> Option<String> {
    match rule.kind() {
        RuleKind::Required => (value == 0).then(|| "This field is required".to_string()),
        RuleKind::Min => match rule.params().first().and_then(Value::as_u64) {
            Some(min) if value < min => Some(format!("Value must be at least {min}")),
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Uint),
        },
        RuleKind::Max => match rule.params().first().and_then(Value::as_u64) {
            Some(max) if value > max => Some(format!("Value must be at most {max}")),
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Uint),
        },
        RuleKind::Range => {
            let min = rule.params().first().and_then(Value::as_u64);
            let max = rule.params().get(1).and_then(Value::as_u64);
            match (min, max) {
                (Some(min), Some(max)) if value < min || value > max => {
                    Some(format!("Value must be between {min} and {max}"))
                }
                (Some(_), Some(_)) => None,
                _ => inapplicable(rule, FieldKind::Uint),
            }
        }
        RuleKind::Equal => match rule.params().first().and_then(Value::as_u64) {
            Some(expected) if value != expected => Some(format!("Value must equal {expected}")),
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Uint),
        },
        RuleKind::OneOf => rule
            .params()
            .iter()
            .all(|p| p.as_u64() != Some(value))
            .then(|| one_of_message(rule)),
        _ => inapplicable(rule, FieldKind::Uint),
    }
}

fn check_float(value: f64, rule: &Rule) -> Option<String> {
    match rule.kind() {
        RuleKind::Required => (value == 0.0).then(|| "This field is required".to_string()),
        RuleKind::Min => match rule.params().first().and_then(Value::as_f64) {
            Some(min) if value < min => Some(format!("Value must be at least {min}")),
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Float),
        },
        RuleKind::Max => match rule.params().first().and_then(Value::as_f64) {
            Some(max) if value > max => Some(format!("Value must be at most {max}")),
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Float),
        },
        RuleKind::Range => {
            let min = rule.params().first().and_then(Value::as_f64);
            let max = rule.params().get(1).and_then(Value::as_f64);
            match (min, max) {
                (Some(min), Some(max)) if value < min || value > max => {
                    Some(format!("Value must be between {min} and {max}"))
                }
                (Some(_), Some(_)) => None,
                _ => inapplicable(rule, FieldKind::Float),
            }
        }
        RuleKind::Equal => match rule.params().first().and_then(Value::as_f64) {
            Some(expected) if value != expected => Some(format!("Value must equal {expected}")),
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Float),
        },
        RuleKind::OneOf => rule
            .params()
            .iter()
            .all(|p| p.as_f64() != Some(value))
            .then(|| one_of_message(rule)),
        _ => inapplicable(rule, FieldKind::Float),
    }
}

fn check_str(value: &str, rule: &Rule) -> Option<String> {
    let length = || value.chars().count() as u64;
    match rule.kind() {
        RuleKind::Required => value
            .trim()
            .is_empty()
            .then(|| "This field is required".to_string()),
        RuleKind::MinLen => match rule.params().first().and_then(Value::as_u64) {
            Some(min) if length() < min => {
                Some(format!("Length must be at least {min} characters"))
            }
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Str),
        },
        RuleKind::MaxLen => match rule.params().first().and_then(Value::as_u64) {
            Some(max) if length() > max => {
                Some(format!("Length must be at most {max} characters"))
            }
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Str),
        },
        RuleKind::ExactLen => match rule.params().first().and_then(Value::as_u64) {
            Some(len) if length() != len => {
                Some(format!("Length must be exactly {len} characters"))
            }
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Str),
        },
        RuleKind::Pattern => {
            let pattern = rule
                .params()
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default();
            match rule.regex() {
                Some(regex) if !regex.is_match(value) => {
                    Some(format!("Value does not match pattern: {pattern}"))
                }
                Some(_) => None,
                None => Some(format!("Invalid regex pattern: {pattern}")),
            }
        }
        RuleKind::Email => (!email_regex().is_match(value))
            .then(|| "Invalid email format".to_string()),
        RuleKind::Url => (!url_regex().is_match(value)).then(|| "Invalid URL format".to_string()),
        RuleKind::Equal => match rule.params().first().and_then(Value::as_str) {
            Some(expected) if value != expected => Some(format!("Value must equal {expected}")),
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Str),
        },
        RuleKind::OneOf => rule
            .params()
            .iter()
            .all(|p| p.as_str() != Some(value))
            .then(|| one_of_message(rule)),
        _ => inapplicable(rule, FieldKind::Str),
    }
}

fn check_bool(value: bool, rule: &Rule) -> Option<String> {
    match rule.kind() {
        RuleKind::Required => (!value).then(|| "This field is required".to_string()),
        RuleKind::Equal => match rule.params().first().and_then(Value::as_bool) {
            Some(expected) if value != expected => Some(format!("Value must be {expected}")),
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Bool),
        },
        _ => inapplicable(rule, FieldKind::Bool),
    }
}

fn check_seq(value: &dyn Sequence, rule: &Rule) -> Option<String> {
    match rule.kind() {
        RuleKind::Required => value
            .is_empty()
            .then(|| "This field is required".to_string()),
        RuleKind::MinLen => match rule.params().first().and_then(Value::as_u64) {
            Some(min) if (value.len() as u64) < min => {
                Some(format!("Must contain at least {min} items"))
            }
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Seq),
        },
        RuleKind::MaxLen => match rule.params().first().and_then(Value::as_u64) {
            Some(max) if (value.len() as u64) > max => {
                Some(format!("Must contain at most {max} items"))
            }
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Seq),
        },
        RuleKind::ExactLen => match rule.params().first().and_then(Value::as_u64) {
            Some(len) if value.len() as u64 != len => {
                Some(format!("Must contain exactly {len} items"))
            }
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Seq),
        },
        RuleKind::Unique => value
            .has_duplicates()
            .then(|| "Items must be unique".to_string()),
        _ => inapplicable(rule, FieldKind::Seq),
    }
}

fn check_time(value: DateTime<Utc>, rule: &Rule) -> Option<String> {
    match rule.kind() {
        RuleKind::Required => {
            (value == DateTime::UNIX_EPOCH).then(|| "This field is required".to_string())
        }
        // After/Before are strict: the boundary instant itself fails.
        RuleKind::After => match rule.params().first().and_then(Value::as_time) {
            Some(instant) if value <= instant => {
                Some(format!("Must be after {}", instant.to_rfc3339()))
            }
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Time),
        },
        RuleKind::Before => match rule.params().first().and_then(Value::as_time) {
            Some(instant) if value >= instant => {
                Some(format!("Must be before {}", instant.to_rfc3339()))
            }
            Some(_) => None,
            None => inapplicable(rule, FieldKind::Time),
        },
        _ => inapplicable(rule, FieldKind::Time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use proptest::prelude::*;

    fn rule(kind: RuleKind, params: Vec<Value>) -> Rule {
        Rule::new(kind, params)
    }

    #[test]
    fn int_bounds() {
        let min = rule(RuleKind::Min, vec![Value::Int(10)]);
        assert!(check_int(10, &min).is_none());
        assert_eq!(
            check_int(9, &min).as_deref(),
            Some("Value must be at least 10")
        );

        let range = rule(RuleKind::Range, vec![Value::Int(1), Value::Int(5)]);
        assert!(check_int(3, &range).is_none());
        assert!(check_int(0, &range).is_some());
        assert!(check_int(6, &range).is_some());
    }

    #[test]
    fn int_one_of() {
        let r = rule(RuleKind::OneOf, vec![Value::Int(1), Value::Int(2)]);
        assert!(check_int(2, &r).is_none());
        assert_eq!(
            check_int(3, &r).as_deref(),
            Some("Value must be one of: 1, 2")
        );
    }

    #[test]
    fn required_is_non_zero_per_family() {
        let r = rule(RuleKind::Required, Vec::new());
        assert!(check_int(0, &r).is_some());
        assert!(check_int(-1, &r).is_none());
        assert!(check_uint(0, &r).is_some());
        assert!(check_float(0.0, &r).is_some());
        assert!(check_float(0.5, &r).is_none());
        assert!(check_bool(false, &r).is_some());
        assert!(check_bool(true, &r).is_none());
    }

    #[test]
    fn numeric_families_do_not_cross() {
        // An i64 bound applied to a uint field is inapplicable, not coerced.
        let r = rule(RuleKind::Min, vec![Value::Int(10)]);
        let message = check_uint(50, &r).unwrap();
        assert!(message.contains("does not apply"));
    }

    #[test]
    fn str_lengths_count_chars() {
        let min = rule(RuleKind::MinLen, vec![Value::Uint(3)]);
        assert!(check_str("héé", &min).is_none());
        assert!(check_str("hé", &min).is_some());

        let exact = rule(RuleKind::ExactLen, vec![Value::Uint(2)]);
        assert!(check_str("ab", &exact).is_none());
        assert!(check_str("abc", &exact).is_some());
    }

    #[test]
    fn str_required_rejects_blank() {
        let r = rule(RuleKind::Required, Vec::new());
        assert!(check_str("", &r).is_some());
        assert!(check_str("   ", &r).is_some());
        assert!(check_str("x", &r).is_none());
    }

    #[test]
    fn str_formats() {
        let email = rule(RuleKind::Email, Vec::new());
        assert!(check_str("user.name+tag@domain.co.uk", &email).is_none());
        assert!(check_str("not-an-email", &email).is_some());

        let url = rule(RuleKind::Url, Vec::new());
        assert!(check_str("https://example.com/path?q=1", &url).is_none());
        assert!(check_str("example.com", &url).is_some());
    }

    #[test]
    fn str_pattern() {
        let ok = Rule::pattern(r"^\d{3}-\d{4}$");
        assert!(check_str("123-4567", &ok).is_none());
        assert_eq!(
            check_str("1234567", &ok).as_deref(),
            Some(r"Value does not match pattern: ^\d{3}-\d{4}$")
        );

        let bad = Rule::pattern("[unclosed");
        let message = check_str("anything", &bad).unwrap();
        assert!(message.contains("Invalid regex pattern"));
    }

    #[test]
    fn seq_checks_via_view() {
        use crate::fields::SeqField;

        let seq = SeqField::new(vec![1, 2, 2]);
        let view: &dyn Sequence = &seq;

        assert!(check_seq(view, &rule(RuleKind::Required, Vec::new())).is_none());
        assert!(check_seq(view, &rule(RuleKind::MinLen, vec![Value::Uint(4)])).is_some());
        assert!(check_seq(view, &rule(RuleKind::ExactLen, vec![Value::Uint(3)])).is_none());
        assert_eq!(
            check_seq(view, &rule(RuleKind::Unique, Vec::new())).as_deref(),
            Some("Items must be unique")
        );

        let empty = SeqField::<i32>::default();
        assert!(check_seq(&empty, &rule(RuleKind::Required, Vec::new())).is_some());
    }

    #[test]
    fn time_comparisons_are_strict() {
        let now = DateTime::UNIX_EPOCH + TimeDelta::days(365);
        let after = rule(RuleKind::After, vec![Value::Time(now)]);

        assert!(check_time(now, &after).is_some());
        assert!(check_time(now + TimeDelta::nanoseconds(1), &after).is_none());

        let before = rule(RuleKind::Before, vec![Value::Time(now)]);
        assert!(check_time(now, &before).is_some());
        assert!(check_time(now - TimeDelta::nanoseconds(1), &before).is_none());
    }

    #[test]
    fn time_required_rejects_epoch() {
        let r = rule(RuleKind::Required, Vec::new());
        assert!(check_time(DateTime::UNIX_EPOCH, &r).is_some());
        assert!(check_time(DateTime::UNIX_EPOCH + TimeDelta::seconds(1), &r).is_none());
    }

    #[test]
    fn inapplicable_rule_reports_instead_of_panicking() {
        let r = rule(RuleKind::Pattern, vec![Value::Str("^a$".into())]);
        let message = check_int(5, &r).unwrap();
        assert!(message.contains("VALIDATION.PATTERN"));
        assert!(message.contains("integer"));
    }

    proptest! {
        #[test]
        fn range_pass_iff_within_bounds(value in -1000i64..1000, min in -500i64..0, max in 0i64..500) {
            let r = rule(RuleKind::Range, vec![Value::Int(min), Value::Int(max)]);
            let passed = check_int(value, &r).is_none();
            prop_assert_eq!(passed, value >= min && value <= max);
        }

        #[test]
        fn min_len_matches_char_count(s in "[a-zé]{0,16}", min in 0u64..20) {
            let r = rule(RuleKind::MinLen, vec![Value::Uint(min)]);
            let passed = check_str(&s, &r).is_none();
            prop_assert_eq!(passed, s.chars().count() as u64 >= min);
        }
    }
}
