//! Process-wide schema registry.
//!
//! One entry per registered root type, keyed by `TypeId`. Reads are
//! concurrent; a registration takes the write lock only for the map swap.
//! Re-registration overwrites — last writer wins — and a schema already
//! handed out keeps working because readers hold their own `Arc`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::schema::Schema;

type SchemaMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

static SCHEMAS: OnceLock<RwLock<SchemaMap>> = OnceLock::new();

fn table() -> &'static RwLock<SchemaMap> {
    SCHEMAS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Publish a schema for `T`, replacing any previous one.
pub(crate) fn publish<T: 'static>(schema: Schema<T>) {
    let mut map = table()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    map.insert(TypeId::of::<T>(), Arc::new(schema));
}

/// Fetch the current schema for `T`, if one was ever published.
pub(crate) fn lookup<T: 'static>() -> Option<Arc<Schema<T>>> {
    let map = table().read().unwrap_or_else(PoisonError::into_inner);
    let entry = Arc::clone(map.get(&TypeId::of::<T>())?);
    entry.downcast::<Schema<T>>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::Tape;
    use crate::schema::SchemaWalker;

    struct Marker;

    fn empty_schema<T: 'static>(fail_fast: bool) -> Schema<T> {
        SchemaWalker::<T>::new().into_schema(Tape::default(), fail_fast)
    }

    #[test]
    fn lookup_before_publish_is_none() {
        assert!(lookup::<Marker>().is_none());
    }

    #[test]
    fn publish_then_lookup_roundtrips() {
        struct Local;
        publish(empty_schema::<Local>(true));
        let schema = lookup::<Local>().expect("schema published");
        assert!(schema.fail_fast());
    }

    #[test]
    fn republish_overwrites_but_old_handles_stay_usable() {
        struct Local;
        publish(empty_schema::<Local>(true));
        let old = lookup::<Local>().unwrap();

        publish(empty_schema::<Local>(false));
        let new = lookup::<Local>().unwrap();

        assert!(old.fail_fast());
        assert!(!new.fail_fast());
    }
}
