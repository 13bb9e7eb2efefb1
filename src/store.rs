//! In-memory indirect object store.
//!
//! Both the authoring document and the file reader keep their objects
//! here, so the checkers see one object graph regardless of where it came
//! from.

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use indexmap::IndexMap;

/// Reference chains longer than this are treated as broken.
const MAX_REFERENCE_CHAIN: usize = 32;

static NULL: Object = Object::Null;

/// Indirect objects keyed by reference.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    objects: IndexMap<ObjectRef, Object>,
    next_id: u32,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore {
    /// Create an empty store. Object numbers start at 1.
    pub fn new() -> Self {
        Self {
            objects: IndexMap::new(),
            next_id: 1,
        }
    }

    /// Add an object under the next free number.
    pub fn insert(&mut self, object: Object) -> ObjectRef {
        let reference = ObjectRef::new(self.next_id, 0);
        self.next_id += 1;
        self.objects.insert(reference, object);
        reference
    }

    /// Reserve a number for an object that will be set later.
    pub fn reserve(&mut self) -> ObjectRef {
        self.insert(Object::Null)
    }

    /// Put an object under a specific reference, replacing any previous one.
    pub fn set(&mut self, reference: ObjectRef, object: Object) {
        self.next_id = self.next_id.max(reference.id + 1);
        self.objects.insert(reference, object);
    }

    /// Look up an object.
    pub fn get(&self, reference: ObjectRef) -> Option<&Object> {
        self.objects.get(&reference)
    }

    /// Look up an object, failing if it does not exist.
    pub fn fetch(&self, reference: ObjectRef) -> Result<&Object> {
        self.get(reference)
            .ok_or(Error::ObjectNotFound(reference.id, reference.gen))
    }

    /// Mutable lookup.
    pub fn get_mut(&mut self, reference: ObjectRef) -> Option<&mut Object> {
        self.objects.get_mut(&reference)
    }

    /// Follow references until a direct object is reached. Dangling
    /// references resolve to null, as ISO 32000 prescribes.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        let mut current = object;
        for _ in 0..MAX_REFERENCE_CHAIN {
            match current {
                Object::Reference(r) => match self.objects.get(r) {
                    Some(target) => current = target,
                    None => return &NULL,
                },
                _ => return current,
            }
        }
        &NULL
    }

    /// Resolve `object` and view it as a dictionary (or stream dictionary).
    pub fn resolve_dict<'a>(&'a self, object: &'a Object) -> Option<&'a Dictionary> {
        self.resolve(object).as_dict()
    }

    /// Resolve a dictionary entry.
    pub fn entry<'a>(&'a self, dict: &'a Dictionary, key: &str) -> Option<&'a Object> {
        dict.get(key).map(|v| self.resolve(v)).filter(|v| !v.is_null())
    }

    /// Resolve a dictionary entry and view it as a dictionary.
    pub fn entry_dict<'a>(&'a self, dict: &'a Dictionary, key: &str) -> Option<&'a Dictionary> {
        self.entry(dict, key).and_then(Object::as_dict)
    }

    /// Resolve a dictionary entry and view it as an array.
    pub fn entry_array<'a>(&'a self, dict: &'a Dictionary, key: &str) -> Option<&'a Vec<Object>> {
        self.entry(dict, key).and_then(Object::as_array)
    }

    /// Number of indirect objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate objects in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectRef, &Object)> {
        self.objects.iter()
    }

    /// Highest object number plus one, the trailer /Size.
    pub fn size(&self) -> u32 {
        self.objects.keys().map(|r| r.id).max().unwrap_or(0) + 1
    }
}
