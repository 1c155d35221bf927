//! Compiled per-type schemas and the builder that produces them.
//!
//! The builder walks a type's field layout exactly once, at registration.
//! Every leaf field gets a dense slot id (assigned depth-first in declaration
//! order) and a composed getter closure; validation later reads values
//! through those getters, so no per-call introspection ever happens. Slot
//! order reproduces field-layout order, which keeps evaluation deterministic.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::Sequence;
use crate::recorder::Tape;
use crate::rule::Rule;

/// Dense identifier of a leaf field within its root type's layout.
///
/// Plays the role a byte offset would play in an offset-table design: slot
/// ids are assigned in walk order, so ascending slots equal layout order.
pub type SlotId = u32;

/// Primitive kind tag of a leaf field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Int,
    Uint,
    Float,
    Str,
    Bool,
    Seq,
    Time,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Int => "integer",
            FieldKind::Uint => "unsigned integer",
            FieldKind::Float => "float",
            FieldKind::Str => "string",
            FieldKind::Bool => "bool",
            FieldKind::Seq => "sequence",
            FieldKind::Time => "timestamp",
        }
    }
}

/// Borrowed view of a leaf field's current value.
///
/// Checkers match on this exhaustively; there is no generic "any numeric"
/// path, so no precision-losing conversions can occur.
#[derive(Clone, Copy)]
pub enum FieldRef<'a> {
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(&'a str),
    Bool(bool),
    Seq(&'a dyn Sequence),
    Time(DateTime<Utc>),
}

impl FieldRef<'_> {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldRef::Int(_) => FieldKind::Int,
            FieldRef::Uint(_) => FieldKind::Uint,
            FieldRef::Float(_) => FieldKind::Float,
            FieldRef::Str(_) => FieldKind::Str,
            FieldRef::Bool(_) => FieldKind::Bool,
            FieldRef::Seq(_) => FieldKind::Seq,
            FieldRef::Time(_) => FieldKind::Time,
        }
    }
}

impl fmt::Debug for FieldRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Int(v) => write!(f, "Int({v})"),
            FieldRef::Uint(v) => write!(f, "Uint({v})"),
            FieldRef::Float(v) => write!(f, "Float({v})"),
            FieldRef::Str(v) => write!(f, "Str({v:?})"),
            FieldRef::Bool(v) => write!(f, "Bool({v})"),
            FieldRef::Seq(v) => write!(f, "Seq(len={})", v.len()),
            FieldRef::Time(v) => write!(f, "Time({})", v.to_rfc3339()),
        }
    }
}

/// Shared borrow accessor from a root instance to a nested node.
pub type Getter<Root, F> = Arc<dyn for<'a> Fn(&'a Root) -> &'a F + Send + Sync>;

/// Mutable accessor used only while binding probe slots at registration.
pub type GetterMut<Root, F> = Rc<dyn for<'a> Fn(&'a mut Root) -> &'a mut F>;

/// Accessor from a root instance to a leaf field's value view.
pub type ValueGetter<Root> = Arc<dyn for<'a> Fn(&'a Root) -> FieldRef<'a> + Send + Sync>;

/// Funnel a closure into a [`Getter`], forcing the higher-ranked signature.
pub fn getter<Root, F>(
    f: impl for<'a> Fn(&'a Root) -> &'a F + Send + Sync + 'static,
) -> Getter<Root, F> {
    Arc::new(f)
}

/// Funnel a closure into a [`GetterMut`].
pub fn getter_mut<Root, F>(
    f: impl for<'a> Fn(&'a mut Root) -> &'a mut F + 'static,
) -> GetterMut<Root, F> {
    Rc::new(f)
}

/// Funnel a closure into a [`ValueGetter`].
pub fn value_getter<Root>(
    f: impl for<'a> Fn(&'a Root) -> FieldRef<'a> + Send + Sync + 'static,
) -> ValueGetter<Root> {
    Arc::new(f)
}

/// A node in a declarable type's field tree.
///
/// Leaf wrappers register themselves as a single field; aggregate types
/// (via `#[derive(Schema)]`) recurse into their fields with the accumulated
/// name path and composed accessors. Timestamp wrappers are leaves, so they
/// are never recursed into even though they wrap an aggregate internally.
pub trait SchemaNode {
    /// Register this node's leaf fields with the walker.
    fn declare<Root: 'static>(
        walker: &mut SchemaWalker<Root>,
        name: &str,
        get: Getter<Root, Self>,
        get_mut: GetterMut<Root, Self>,
    ) where
        Self: Sized;
}

/// A root type whose schema can be registered.
///
/// Implemented by `#[derive(Schema)]` for plain structs with named fields.
/// Non-aggregate types cannot implement this, which moves the original
/// "target must be an aggregate" registration failure to compile time.
pub trait Schematic: SchemaNode + Default + 'static {
    /// Walk the field layout once, producing the walker with every leaf's
    /// name, kind, getter and probe binder.
    fn layout() -> SchemaWalker<Self>
    where
        Self: Sized,
    {
        let mut walker = SchemaWalker::new();
        Self::declare(
            &mut walker,
            "",
            getter(|root: &Self| root),
            getter_mut(|root: &mut Self| root),
        );
        walker
    }
}

struct LeafMeta<Root> {
    name: String,
    kind: FieldKind,
    read: ValueGetter<Root>,
}

/// Accumulates the one-time field walk for a root type.
pub struct SchemaWalker<Root> {
    prefix: Vec<String>,
    leaves: Vec<LeafMeta<Root>>,
    binders: Vec<Box<dyn Fn(&mut Root)>>,
}

impl<Root: 'static> SchemaWalker<Root> {
    pub fn new() -> Self {
        Self {
            prefix: Vec::new(),
            leaves: Vec::new(),
            binders: Vec::new(),
        }
    }

    /// Enter a nested aggregate. The empty name marks the root and adds no
    /// path segment.
    pub fn enter(&mut self, name: &str) {
        if !name.is_empty() {
            self.prefix.push(name.to_string());
        }
    }

    /// Leave a nested aggregate entered with the same name.
    pub fn exit(&mut self, name: &str) {
        if !name.is_empty() {
            self.prefix.pop();
        }
    }

    /// Register one leaf field: display name, kind, value getter and the
    /// binder that stamps the leaf's slot id onto a probe instance.
    pub fn leaf(
        &mut self,
        name: &str,
        kind: FieldKind,
        read: ValueGetter<Root>,
        bind: impl Fn(&mut Root, SlotId) + 'static,
    ) {
        let slot = self.leaves.len() as SlotId;
        let name = if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.prefix.join("."), name)
        };
        self.leaves.push(LeafMeta { name, kind, read });
        self.binders.push(Box::new(move |root| bind(root, slot)));
    }

    /// Number of leaves discovered so far.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Stamp every leaf's slot id onto the probe.
    pub(crate) fn bind_probe(&self, probe: &mut Root) {
        for bind in &self.binders {
            bind(probe);
        }
    }

    /// Combine the walked layout with a recorded tape into a schema.
    ///
    /// Only slots that actually recorded rules become field plans; the tape
    /// iterates in ascending slot order, and every recorded slot necessarily
    /// came from a binder, so the leaf table lookup cannot miss.
    pub(crate) fn into_schema(self, tape: Tape, fail_fast: bool) -> Schema<Root> {
        let mut fields = Vec::new();
        for (slot, rules) in tape.into_rules() {
            let meta = &self.leaves[slot as usize];
            fields.push(FieldPlan {
                slot,
                name: meta.name.clone(),
                kind: meta.kind,
                read: Arc::clone(&meta.read),
                rules,
            });
        }
        Schema { fields, fail_fast }
    }
}

impl<Root: 'static> Default for SchemaWalker<Root> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct FieldPlan<Root> {
    pub(crate) slot: SlotId,
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    pub(crate) read: ValueGetter<Root>,
    pub(crate) rules: Vec<Rule>,
}

/// Compiled, immutable validation plan for one root type.
///
/// Field plans are kept in ascending slot order; the evaluator walks them
/// front to back, which is what makes fail-fast mode deterministic.
pub struct Schema<Root> {
    fields: Vec<FieldPlan<Root>>,
    fail_fast: bool,
}

impl<Root> Schema<Root> {
    /// Whether this schema stops at the first error.
    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Number of constrained fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Introspect the constrained fields in evaluation order.
    pub fn fields(&self) -> impl Iterator<Item = FieldInfo<'_>> {
        self.fields.iter().map(|plan| FieldInfo {
            name: &plan.name,
            kind: plan.kind,
            rules: plan.rules.len(),
        })
    }

    pub(crate) fn plans(&self) -> &[FieldPlan<Root>] {
        &self.fields
    }
}

impl<Root> fmt::Debug for Schema<Root> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("fail_fast", &self.fail_fast)
            .field(
                "fields",
                &self
                    .fields
                    .iter()
                    .map(|plan| (plan.slot, &plan.name, plan.kind, plan.rules.len()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Introspection entry for one constrained field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo<'a> {
    pub name: &'a str,
    pub kind: FieldKind,
    pub rules: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{IntField, StrField};

    #[derive(Default)]
    struct Flat {
        count: IntField,
        label: StrField,
    }

    impl SchemaNode for Flat {
        fn declare<Root: 'static>(
            walker: &mut SchemaWalker<Root>,
            name: &str,
            get: Getter<Root, Self>,
            get_mut: GetterMut<Root, Self>,
        ) {
            walker.enter(name);
            {
                let get = Arc::clone(&get);
                let get_mut = Rc::clone(&get_mut);
                IntField::declare(
                    walker,
                    "count",
                    getter(move |root: &Root| &(*get)(root).count),
                    getter_mut(move |root: &mut Root| &mut (*get_mut)(root).count),
                );
            }
            {
                let get = Arc::clone(&get);
                let get_mut = Rc::clone(&get_mut);
                StrField::declare(
                    walker,
                    "label",
                    getter(move |root: &Root| &(*get)(root).label),
                    getter_mut(move |root: &mut Root| &mut (*get_mut)(root).label),
                );
            }
            walker.exit(name);
        }
    }

    impl Schematic for Flat {}

    #[test]
    fn layout_assigns_slots_in_declaration_order() {
        let walker = Flat::layout();
        assert_eq!(walker.leaf_count(), 2);
    }

    #[test]
    fn getters_read_through_the_layout() {
        let walker = Flat::layout();
        let mut value = Flat::default();
        value.count.set(7);
        value.label.set("hello");

        let reads: Vec<String> = walker
            .leaves
            .iter()
            .map(|leaf| format!("{:?}", (*leaf.read)(&value)))
            .collect();
        assert_eq!(reads, ["Int(7)", "Str(\"hello\")"]);
    }

    #[test]
    fn nested_prefix_joins_with_dots() {
        let mut walker = SchemaWalker::<Flat>::new();
        walker.enter("outer");
        walker.enter("inner");
        walker.leaf(
            "leaf",
            FieldKind::Int,
            value_getter(|_root: &Flat| FieldRef::Int(0)),
            |_, _| {},
        );
        walker.exit("inner");
        walker.exit("outer");

        assert_eq!(walker.leaves[0].name, "outer.inner.leaf");
    }
}
