use crate::{
    error::BackendError,
    traits::FieldValue,
    value::{Dictionary, Value},
};
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

///
/// MemoryObject
///
/// One stored object. Relationship attributes hold `Value::ObjectId`
/// (to-one) or a list of them (to-many).
///

#[derive(Clone, Debug, PartialEq)]
pub struct MemoryObject {
    id: u64,
    entity: String,
    values: Dictionary,
}

impl MemoryObject {
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    #[must_use]
    pub const fn values(&self) -> &Dictionary {
        &self.values
    }

    /// Read one stored attribute; a missing attribute reads as null.
    #[must_use]
    pub fn get(&self, key: &str) -> &Value {
        self.values.value(key)
    }

    #[must_use]
    pub fn get_as<T: FieldValue>(&self, key: &str) -> Option<T> {
        T::from_value(self.get(key))
    }
}

///
/// MemoryStore
///
/// Registered entities with their objects in insertion order.
///

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    next_id: u64,
    entities: BTreeMap<String, Vec<u64>>,
    objects: BTreeMap<u64, MemoryObject>,
}

impl MemoryStore {
    pub(crate) fn is_registered(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    pub(crate) fn object(&self, id: u64) -> Option<&MemoryObject> {
        self.objects.get(&id)
    }

    /// Objects of one entity in insertion order.
    pub(crate) fn objects_of<'s>(
        &'s self,
        entity: &str,
    ) -> impl Iterator<Item = &'s MemoryObject> + 's {
        self.entities
            .get(entity)
            .into_iter()
            .flatten()
            .filter_map(|id| self.objects.get(id))
    }
}

///
/// MemoryContext
///
/// Cloneable handle to one in-memory store. Clones share the store.
/// Confined to one thread; the store is never locked.
///

#[derive(Clone, Debug, Default)]
pub struct MemoryContext {
    store: Rc<RefCell<MemoryStore>>,
}

impl MemoryContext {
    /// Empty store with no registered entities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entities<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let context = Self::new();
        for entity in entities {
            context.register(entity);
        }

        context
    }

    /// Register an entity name; registering twice keeps existing objects.
    pub fn register(&self, entity: impl Into<String>) {
        self.store
            .borrow_mut()
            .entities
            .entry(entity.into())
            .or_default();
    }

    /// Store a new object and return its identifier.
    pub fn insert(&self, entity: &str, values: Dictionary) -> Result<u64, BackendError> {
        let mut store = self.store.borrow_mut();
        if !store.is_registered(entity) {
            return Err(BackendError::invalid_request(format!(
                "entity '{entity}' is not registered in this store"
            )));
        }

        store.next_id += 1;
        let id = store.next_id;
        store.objects.insert(
            id,
            MemoryObject {
                id,
                entity: entity.to_string(),
                values,
            },
        );
        store.entities.entry(entity.to_string()).or_default().push(id);

        Ok(id)
    }

    #[must_use]
    pub fn object(&self, id: u64) -> Option<MemoryObject> {
        self.store.borrow().object(id).cloned()
    }

    /// Number of stored objects for one entity.
    #[must_use]
    pub fn len(&self, entity: &str) -> usize {
        self.store
            .borrow()
            .entities
            .get(entity)
            .map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self, entity: &str) -> bool {
        self.len(entity) == 0
    }

    /// Whether both handles refer to the same store.
    #[must_use]
    pub fn same_store(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
    }

    pub(crate) fn with_store<R>(&self, f: impl FnOnce(&MemoryStore) -> R) -> R {
        f(&self.store.borrow())
    }
}
