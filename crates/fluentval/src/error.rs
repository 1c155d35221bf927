//! Validation error and result types.

use serde::{Deserialize, Serialize};

/// Trait for translating validation error messages.
///
/// Implementations map a rule code and field name to a localized message;
/// returning `None` keeps the original message.
pub trait Translator {
    /// Translate the message for a failed rule.
    ///
    /// # Arguments
    ///
    /// * `code` - The rule code (e.g., `VALIDATION.REQUIRED`)
    /// * `field` - The dotted field path (e.g., `address.city`)
    fn translate(&self, code: &str, field: &str) -> Option<String>;
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{field}: {message} [{code}]")]
pub struct ValidationError {
    /// Dotted path of the field that failed validation
    pub field: String,
    /// Rule code derived from the rule kind (e.g., `VALIDATION.RANGE`)
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Ordered collection of validation errors.
///
/// An empty collection means "valid". Errors appear in evaluation order:
/// fields in ascending schema order, rules in declaration order. The ordering
/// is part of the contract — fail-fast mode and first-failure message checks
/// depend on it, which is why this is a `Vec` and not a field-keyed map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("validation failed: {} error(s)", .0.len())]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an error.
    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// Append an error built from its parts.
    pub fn add(
        &mut self,
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.0.push(ValidationError::new(field, code, message));
    }

    /// Append all errors from another collection, preserving order.
    pub fn merge(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    /// Whether the collection is empty (i.e., validation passed).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the errors in evaluation order.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// The first error, if any.
    pub fn first(&self) -> Option<&ValidationError> {
        self.0.first()
    }

    /// Errors for a specific field path.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.0.iter().filter(move |e| e.field == field)
    }

    /// Convert to a `Result` — `Ok` if empty, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Rewrite messages through a [`Translator`], keeping untranslated ones.
    pub fn localize<T: Translator>(&self, translator: &T) -> Self {
        Self(
            self.0
                .iter()
                .map(|e| ValidationError {
                    field: e.field.clone(),
                    code: e.code.clone(),
                    message: translator
                        .translate(&e.code, &e.field)
                        .unwrap_or_else(|| e.message.clone()),
                })
                .collect(),
        )
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Outcome of a validation run.
///
/// Invariant: `is_valid` is always the negation of "errors is non-empty".
/// Fields are private so every way of constructing a result — including
/// deserialization — goes through [`ValidationResult::from_errors`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    is_valid: bool,
    errors: ValidationErrors,
}

impl ValidationResult {
    /// A successful result with no errors.
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: ValidationErrors::new(),
        }
    }

    /// Build a result from collected errors; `is_valid` is derived.
    pub fn from_errors(errors: ValidationErrors) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Whether validation passed.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// The collected errors (empty when valid).
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Consume the result, yielding the errors.
    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }

    /// Convert to a `Result` — `Ok` if valid.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        self.errors.into_result()
    }
}

impl<'de> Deserialize<'de> for ValidationResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Incoming `is_valid` is ignored; it is recomputed from the errors so
        // the invariant cannot be violated by crafted input.
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            errors: ValidationErrors,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(ValidationResult::from_errors(raw.errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let error = ValidationError::new("email", "VALIDATION.EMAIL", "Invalid email format");
        assert_eq!(
            error.to_string(),
            "email: Invalid email format [VALIDATION.EMAIL]"
        );
    }

    #[test]
    fn errors_preserve_order() {
        let mut errors = ValidationErrors::new();
        errors.add("a", "VALIDATION.MIN", "first");
        errors.add("b", "VALIDATION.MIN", "second");
        errors.add("a", "VALIDATION.MAX", "third");

        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["first", "second", "third"]);
        assert_eq!(errors.for_field("a").count(), 2);
    }

    #[test]
    fn errors_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.add("field", "VALIDATION.REQUIRED", "required");
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn errors_merge() {
        let mut first = ValidationErrors::new();
        first.add("a", "VALIDATION.MIN", "a failed");
        let mut second = ValidationErrors::new();
        second.add("b", "VALIDATION.MAX", "b failed");

        first.merge(second);
        assert_eq!(first.len(), 2);
        assert_eq!(first.first().unwrap().field, "a");
    }

    #[test]
    fn result_invariant_holds() {
        assert!(ValidationResult::ok().is_valid());
        assert!(ValidationResult::from_errors(ValidationErrors::new()).is_valid());

        let mut errors = ValidationErrors::new();
        errors.add("x", "VALIDATION.REQUIRED", "required");
        let result = ValidationResult::from_errors(errors);
        assert!(!result.is_valid());
        assert_eq!(result.errors().len(), 1);
    }

    #[test]
    fn result_deserialize_recomputes_validity() {
        // A lying payload: claims valid but carries an error.
        let json = r#"{
            "is_valid": true,
            "errors": [{"field": "x", "code": "VALIDATION.REQUIRED", "message": "required"}]
        }"#;

        let result: ValidationResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_valid());
        assert_eq!(result.errors().len(), 1);
    }

    #[test]
    fn result_serialization() {
        let mut errors = ValidationErrors::new();
        errors.add("age", "VALIDATION.RANGE", "out of range");
        let json = serde_json::to_value(ValidationResult::from_errors(errors)).unwrap();

        assert_eq!(json["is_valid"], false);
        assert_eq!(json["errors"][0]["field"], "age");
        assert_eq!(json["errors"][0]["code"], "VALIDATION.RANGE");
    }

    struct UpperCaser;

    impl Translator for UpperCaser {
        fn translate(&self, code: &str, _field: &str) -> Option<String> {
            (code == "VALIDATION.REQUIRED").then(|| "REQUIRED".to_string())
        }
    }

    #[test]
    fn localize_keeps_untranslated_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("a", "VALIDATION.REQUIRED", "this field is required");
        errors.add("b", "VALIDATION.MIN", "too small");

        let localized = errors.localize(&UpperCaser);
        assert_eq!(localized.first().unwrap().message, "REQUIRED");
        assert_eq!(localized.iter().nth(1).unwrap().message, "too small");
    }
}
