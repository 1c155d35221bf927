//! # FluentVal
//!
//! Compiled struct validation: declare rules once with a fluent API, then
//! validate instances through a precomputed per-type schema with no per-call
//! introspection.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fluentval::prelude::*;
//!
//! #[derive(Default, Schema)]
//! struct CreateUser {
//!     #[schema(name = "email")]
//!     email: StrField,
//!     username: StrField,
//!     age: IntField,
//! }
//!
//! // At start-up: compile the schema once.
//! fluentval::register::<CreateUser>(|user| {
//!     user.email.required().email();
//!     user.username.min_len(3).max_len(50).msg_group("invalid username");
//!     user.age.range(18, 120);
//! });
//!
//! // At request time: walk the compiled schema.
//! let user = CreateUser::default();
//! let result = fluentval::validate(&user);
//! assert!(!result.is_valid());
//! ```
//!
//! ## How it works
//!
//! `register` runs the declaration function against a zero-initialized probe
//! instance whose fields have been stamped with slot ids. Fluent constraint
//! calls record `(slot, rule)` pairs onto a recording tape; the same walk
//! that stamped the slots also captured, per field, a display name (explicit
//! `#[schema(name = "…")]` or lower-camel of the field ident, dotted through
//! nested structs), a kind tag, and a getter closure generated by
//! `#[derive(Schema)]`. Tape plus layout compile into a [`schema::Schema`]
//! held in a process-wide registry; `validate` fetches it by type and reads
//! field values straight through the getters.
//!
//! ## Error format
//!
//! Failures are ordered [`ValidationError`] values — never panics — with a
//! field path, a code derived from the rule kind (`VALIDATION.RANGE`, …) and
//! a message that custom `msg`/`msg_group` declarations can override.

// Lets the derive macro's generated `::fluentval::…` paths resolve inside
// this crate's own tests.
extern crate self as fluentval;

pub mod error;
pub mod fields;
pub mod schema;

mod engine;
mod eval;
mod recorder;
mod registry;
mod rule;

pub use engine::{register, register_all, schema_of, validate, validate_opt};
pub use error::{Translator, ValidationError, ValidationErrors, ValidationResult};
pub use fields::{
    BoolField, FloatField, IntField, SeqField, Sequence, StrField, TimeField, UintField,
};
pub use rule::{Rule, RuleKind, Value};
pub use schema::{FieldInfo, FieldKind, FieldRef, Schema as CompiledSchema, Schematic};

// Re-export the derive macro.
pub use fluentval_macros::Schema;

/// Prelude for DTO declaration and validation call sites.
pub mod prelude {
    pub use crate::engine::{register, register_all, validate, validate_opt};
    pub use crate::error::{ValidationError, ValidationErrors, ValidationResult};
    pub use crate::fields::{
        BoolField, FloatField, IntField, SeqField, StrField, TimeField, UintField,
    };
    pub use fluentval_macros::Schema;
}
