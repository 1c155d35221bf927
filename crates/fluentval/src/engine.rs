//! Registration and validation entry points.

use std::sync::{Mutex, PoisonError};

use crate::error::ValidationResult;
use crate::eval;
use crate::recorder::RecordingSession;
use crate::registry;
use crate::schema::Schematic;

/// Serializes registrations. The recording context is a single slot, so two
/// declaration functions must never interleave — even for different types.
static REGISTRATION: Mutex<()> = Mutex::new(());

/// Register a fail-fast validation schema for `T`.
///
/// The declaration function receives a zero-initialized probe instance;
/// fluent constraint calls on its fields are recorded and compiled into the
/// schema. Registering the same type again replaces the schema entirely.
///
/// ## Example
///
/// ```rust,ignore
/// use fluentval::prelude::*;
///
/// #[derive(Default, Schema)]
/// struct CreateUser {
///     email: StrField,
///     age: IntField,
/// }
///
/// fluentval::register::<CreateUser>(|user| {
///     user.email.required().email();
///     user.age.range(18, 120).msg("age out of range");
/// });
/// ```
pub fn register<T: Schematic>(declare: impl FnOnce(&mut T)) {
    register_with_mode(declare, true);
}

/// Register a collect-all validation schema for `T`.
///
/// Identical to [`register`] except the resulting schema accumulates every
/// failing rule instead of stopping at the first.
pub fn register_all<T: Schematic>(declare: impl FnOnce(&mut T)) {
    register_with_mode(declare, false);
}

fn register_with_mode<T: Schematic>(declare: impl FnOnce(&mut T), fail_fast: bool) {
    let _guard = REGISTRATION
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    // One-time walk of the field layout, then stamp slot ids onto a probe so
    // the declaration function's fluent calls can be attributed to fields.
    let walker = T::layout();
    let mut probe = T::default();
    walker.bind_probe(&mut probe);

    let session = RecordingSession::begin();
    declare(&mut probe);
    let tape = session.finish();

    let schema = walker.into_schema(tape, fail_fast);
    tracing::debug!(
        target: "fluentval",
        type_name = std::any::type_name::<T>(),
        fields = schema.len(),
        fail_fast,
        "registered validation schema"
    );
    registry::publish(schema);
}

/// Validate an instance against its registered schema.
///
/// A type with no registered schema validates trivially — there is nothing
/// to check, which is not an error.
pub fn validate<T: Schematic>(instance: &T) -> ValidationResult {
    match registry::lookup::<T>() {
        Some(schema) => ValidationResult::from_errors(eval::run(&schema, instance)),
        None => ValidationResult::ok(),
    }
}

/// Validate an optional instance; `None` is vacuously valid.
pub fn validate_opt<T: Schematic>(instance: Option<&T>) -> ValidationResult {
    match instance {
        Some(instance) => validate(instance),
        None => ValidationResult::ok(),
    }
}

/// Fetch the currently published schema for `T`, if one was registered.
///
/// The handle stays valid even if a later registration replaces the entry.
pub fn schema_of<T: Schematic>() -> Option<std::sync::Arc<crate::schema::Schema<T>>> {
    registry::lookup::<T>()
}
