//! Field value wrappers.
//!
//! DTO fields are declared with these typed holders. They carry no
//! validation logic themselves: the fluent methods only append rules to the
//! live recording session during registration and are no-ops everywhere
//! else, so business code can call them (or reuse a declaration function)
//! without side effects. Serialization is transparent — a wrapper looks like
//! its raw value on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::recorder;
use crate::rule::{Rule, RuleKind, Value};
use crate::schema::{
    value_getter, FieldKind, FieldRef, Getter, GetterMut, SchemaNode, SchemaWalker, SlotId,
};

/// Length-and-equality view over a sequence field.
///
/// Length checks never materialize elements; `has_duplicates` is the one
/// check that needs the typed elements, and this trait is how it reaches
/// them from behind the untyped field view.
pub trait Sequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn has_duplicates(&self) -> bool;
}

macro_rules! scalar_field {
    (
        $(#[$meta:meta])*
        $name:ident, $raw:ty, $kind:expr, $variant:ident, $zero:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            value: $raw,
            slot: Option<SlotId>,
        }

        impl $name {
            /// Wrap a raw value.
            pub fn new(value: $raw) -> Self {
                Self { value, slot: None }
            }

            /// Current value.
            pub fn get(&self) -> $raw {
                self.value
            }

            /// Replace the value.
            pub fn set(&mut self, value: $raw) {
                self.value = value;
            }

            /// Declare this field required.
            pub fn required(&self) -> &Self {
                recorder::record(self.slot, Rule::new(RuleKind::Required, Vec::new()));
                self
            }

            /// Declare a custom predicate over the raw value.
            pub fn custom<F>(&self, check: F) -> &Self
            where
                F: Fn($raw) -> bool + Send + Sync + 'static,
            {
                recorder::record(
                    self.slot,
                    Rule::custom(move |value: FieldRef<'_>| match value {
                        FieldRef::$variant(v) => check(v),
                        _ => false,
                    }),
                );
                self
            }

            /// Override the message of the rule declared immediately before.
            pub fn msg(&self, text: &str) -> &Self {
                recorder::amend_last(self.slot, text);
                self
            }

            /// Apply `text` to the trailing run of rules that have no
            /// message yet, stopping at the first rule that already has one.
            pub fn msg_group(&self, text: &str) -> &Self {
                recorder::amend_group(self.slot, text);
                self
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new($zero)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.value == other.value
            }
        }

        impl From<$raw> for $name {
            fn from(value: $raw) -> Self {
                Self::new(value)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.value.serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                <$raw>::deserialize(deserializer).map(Self::new)
            }
        }

        impl SchemaNode for $name {
            fn declare<Root: 'static>(
                walker: &mut SchemaWalker<Root>,
                name: &str,
                get: Getter<Root, Self>,
                get_mut: GetterMut<Root, Self>,
            ) {
                walker.leaf(
                    name,
                    $kind,
                    value_getter(move |root: &Root| FieldRef::$variant((*get)(root).value)),
                    move |root: &mut Root, slot| (*get_mut)(root).slot = Some(slot),
                );
            }
        }
    };
}

macro_rules! numeric_rules {
    ($name:ident, $raw:ty, $variant:ident) => {
        impl $name {
            /// Lower bound (inclusive).
            pub fn min(&self, min: $raw) -> &Self {
                recorder::record(self.slot, Rule::new(RuleKind::Min, vec![Value::$variant(min)]));
                self
            }

            /// Upper bound (inclusive).
            pub fn max(&self, max: $raw) -> &Self {
                recorder::record(self.slot, Rule::new(RuleKind::Max, vec![Value::$variant(max)]));
                self
            }

            /// Inclusive bounds on both ends.
            pub fn range(&self, min: $raw, max: $raw) -> &Self {
                recorder::record(
                    self.slot,
                    Rule::new(
                        RuleKind::Range,
                        vec![Value::$variant(min), Value::$variant(max)],
                    ),
                );
                self
            }

            /// Exact value match.
            pub fn equal(&self, expected: $raw) -> &Self {
                recorder::record(
                    self.slot,
                    Rule::new(RuleKind::Equal, vec![Value::$variant(expected)]),
                );
                self
            }

            /// Membership in an allowed set.
            pub fn one_of(&self, allowed: &[$raw]) -> &Self {
                recorder::record(
                    self.slot,
                    Rule::new(
                        RuleKind::OneOf,
                        allowed.iter().map(|v| Value::$variant(*v)).collect(),
                    ),
                );
                self
            }
        }
    };
}

scalar_field!(
    /// Signed integer field.
    IntField, i64, FieldKind::Int, Int, 0
);
scalar_field!(
    /// Unsigned integer field.
    UintField, u64, FieldKind::Uint, Uint, 0
);
scalar_field!(
    /// Floating-point field.
    FloatField, f64, FieldKind::Float, Float, 0.0
);
scalar_field!(
    /// Boolean field. `required` means the value must be `true`.
    BoolField, bool, FieldKind::Bool, Bool, false
);
scalar_field!(
    /// Timestamp field. The zero instant is the Unix epoch; `required`
    /// means "not the zero instant".
    TimeField, DateTime<Utc>, FieldKind::Time, Time, DateTime::UNIX_EPOCH
);

numeric_rules!(IntField, i64, Int);
numeric_rules!(UintField, u64, Uint);
numeric_rules!(FloatField, f64, Float);

impl BoolField {
    /// Exact value match.
    pub fn equal(&self, expected: bool) -> &Self {
        recorder::record(
            self.slot,
            Rule::new(RuleKind::Equal, vec![Value::Bool(expected)]),
        );
        self
    }
}

impl TimeField {
    /// Strictly after the given instant.
    pub fn after(&self, instant: DateTime<Utc>) -> &Self {
        recorder::record(
            self.slot,
            Rule::new(RuleKind::After, vec![Value::Time(instant)]),
        );
        self
    }

    /// Strictly before the given instant.
    pub fn before(&self, instant: DateTime<Utc>) -> &Self {
        recorder::record(
            self.slot,
            Rule::new(RuleKind::Before, vec![Value::Time(instant)]),
        );
        self
    }
}

/// String field.
#[derive(Debug, Clone, Default)]
pub struct StrField {
    value: String,
    slot: Option<SlotId>,
}

impl StrField {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            slot: None,
        }
    }

    pub fn get(&self) -> &str {
        &self.value
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Declare this field required (non-blank).
    pub fn required(&self) -> &Self {
        recorder::record(self.slot, Rule::new(RuleKind::Required, Vec::new()));
        self
    }

    /// Minimum length in characters.
    pub fn min_len(&self, min: usize) -> &Self {
        recorder::record(
            self.slot,
            Rule::new(RuleKind::MinLen, vec![Value::Uint(min as u64)]),
        );
        self
    }

    /// Maximum length in characters.
    pub fn max_len(&self, max: usize) -> &Self {
        recorder::record(
            self.slot,
            Rule::new(RuleKind::MaxLen, vec![Value::Uint(max as u64)]),
        );
        self
    }

    /// Exact length in characters.
    pub fn exact_len(&self, len: usize) -> &Self {
        recorder::record(
            self.slot,
            Rule::new(RuleKind::ExactLen, vec![Value::Uint(len as u64)]),
        );
        self
    }

    /// Must match the given regex pattern.
    pub fn pattern(&self, pattern: &str) -> &Self {
        recorder::record(self.slot, Rule::pattern(pattern));
        self
    }

    /// Must be a well-formed email address.
    pub fn email(&self) -> &Self {
        recorder::record(self.slot, Rule::new(RuleKind::Email, Vec::new()));
        self
    }

    /// Must be a well-formed URL.
    pub fn url(&self) -> &Self {
        recorder::record(self.slot, Rule::new(RuleKind::Url, Vec::new()));
        self
    }

    /// Exact value match.
    pub fn equal(&self, expected: &str) -> &Self {
        recorder::record(
            self.slot,
            Rule::new(RuleKind::Equal, vec![Value::Str(expected.to_string())]),
        );
        self
    }

    /// Membership in an allowed set.
    pub fn one_of(&self, allowed: &[&str]) -> &Self {
        recorder::record(
            self.slot,
            Rule::new(
                RuleKind::OneOf,
                allowed.iter().map(|s| Value::Str((*s).to_string())).collect(),
            ),
        );
        self
    }

    /// Declare a custom predicate over the string value.
    pub fn custom<F>(&self, check: F) -> &Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        recorder::record(
            self.slot,
            Rule::custom(move |value: FieldRef<'_>| match value {
                FieldRef::Str(v) => check(v),
                _ => false,
            }),
        );
        self
    }

    /// Override the message of the rule declared immediately before.
    pub fn msg(&self, text: &str) -> &Self {
        recorder::amend_last(self.slot, text);
        self
    }

    /// Apply `text` to the trailing run of rules that have no message yet.
    pub fn msg_group(&self, text: &str) -> &Self {
        recorder::amend_group(self.slot, text);
        self
    }
}

impl PartialEq for StrField {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<String> for StrField {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for StrField {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Serialize for StrField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StrField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl SchemaNode for StrField {
    fn declare<Root: 'static>(
        walker: &mut SchemaWalker<Root>,
        name: &str,
        get: Getter<Root, Self>,
        get_mut: GetterMut<Root, Self>,
    ) {
        walker.leaf(
            name,
            FieldKind::Str,
            value_getter(move |root: &Root| FieldRef::Str(&(*get)(root).value)),
            move |root: &mut Root, slot| (*get_mut)(root).slot = Some(slot),
        );
    }
}

/// Homogeneous sequence field.
///
/// Rules cover length and uniqueness only; elements themselves are not
/// validated.
#[derive(Debug, Clone)]
pub struct SeqField<T> {
    value: Vec<T>,
    slot: Option<SlotId>,
}

impl<T> SeqField<T> {
    pub fn new(value: Vec<T>) -> Self {
        Self { value, slot: None }
    }

    pub fn get(&self) -> &[T] {
        &self.value
    }

    pub fn set(&mut self, value: Vec<T>) {
        self.value = value;
    }

    pub fn push(&mut self, item: T) {
        self.value.push(item);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.value.iter()
    }

    /// Declare this field required (non-empty).
    pub fn required(&self) -> &Self {
        recorder::record(self.slot, Rule::new(RuleKind::Required, Vec::new()));
        self
    }

    /// Minimum number of items.
    pub fn min_len(&self, min: usize) -> &Self {
        recorder::record(
            self.slot,
            Rule::new(RuleKind::MinLen, vec![Value::Uint(min as u64)]),
        );
        self
    }

    /// Maximum number of items.
    pub fn max_len(&self, max: usize) -> &Self {
        recorder::record(
            self.slot,
            Rule::new(RuleKind::MaxLen, vec![Value::Uint(max as u64)]),
        );
        self
    }

    /// Exact number of items.
    pub fn exact_len(&self, len: usize) -> &Self {
        recorder::record(
            self.slot,
            Rule::new(RuleKind::ExactLen, vec![Value::Uint(len as u64)]),
        );
        self
    }

    /// No duplicate items.
    pub fn unique(&self) -> &Self {
        recorder::record(self.slot, Rule::new(RuleKind::Unique, Vec::new()));
        self
    }

    /// Declare a custom predicate over the sequence view.
    pub fn custom<F>(&self, check: F) -> &Self
    where
        F: Fn(&dyn Sequence) -> bool + Send + Sync + 'static,
    {
        recorder::record(
            self.slot,
            Rule::custom(move |value: FieldRef<'_>| match value {
                FieldRef::Seq(v) => check(v),
                _ => false,
            }),
        );
        self
    }

    /// Override the message of the rule declared immediately before.
    pub fn msg(&self, text: &str) -> &Self {
        recorder::amend_last(self.slot, text);
        self
    }

    /// Apply `text` to the trailing run of rules that have no message yet.
    pub fn msg_group(&self, text: &str) -> &Self {
        recorder::amend_group(self.slot, text);
        self
    }
}

impl<T> Default for SeqField<T> {
    fn default() -> Self {
        Self {
            value: Vec::new(),
            slot: None,
        }
    }
}

impl<T: PartialEq> PartialEq for SeqField<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> From<Vec<T>> for SeqField<T> {
    fn from(value: Vec<T>) -> Self {
        Self::new(value)
    }
}

impl<T: Serialize> Serialize for SeqField<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for SeqField<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::new)
    }
}

impl<T: PartialEq> Sequence for SeqField<T> {
    fn len(&self) -> usize {
        self.value.len()
    }

    fn has_duplicates(&self) -> bool {
        for (i, item) in self.value.iter().enumerate() {
            if self.value[i + 1..].iter().any(|other| other == item) {
                return true;
            }
        }
        false
    }
}

impl<T: PartialEq + 'static> SchemaNode for SeqField<T> {
    fn declare<Root: 'static>(
        walker: &mut SchemaWalker<Root>,
        name: &str,
        get: Getter<Root, Self>,
        get_mut: GetterMut<Root, Self>,
    ) {
        walker.leaf(
            name,
            FieldKind::Seq,
            value_getter(move |root: &Root| FieldRef::Seq((*get)(root) as &dyn Sequence)),
            move |root: &mut Root, slot| (*get_mut)(root).slot = Some(slot),
        );
    }
}
