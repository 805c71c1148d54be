use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use stdkit_base::{ErrorKind, StdkitError, StdkitResult};

use super::ObjectId;

/// Map from object identity to a single value, iterated in insertion order.
pub struct ObjectStorage<K: ?Sized, V> {
    entries: BTreeMap<u64, (Arc<K>, V)>,
    positions: HashMap<ObjectId, u64>,
    next_position: u64,
}

impl<K: ?Sized, V> Default for ObjectStorage<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ?Sized, V> ObjectStorage<K, V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            positions: HashMap::new(),
            next_position: 0,
        }
    }

    pub fn has(&self, object: &Arc<K>) -> bool {
        self.positions.contains_key(&ObjectId::of(object))
    }

    pub fn get(&self, object: &Arc<K>) -> Option<&V> {
        let position = self.positions.get(&ObjectId::of(object))?;
        self.entries.get(position).map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, object: &Arc<K>) -> Option<&mut V> {
        let position = self.positions.get(&ObjectId::of(object))?;
        self.entries.get_mut(position).map(|(_, value)| value)
    }

    /// Like [`get`](Self::get), but a missing object is an error.
    pub fn require(&self, object: &Arc<K>) -> StdkitResult<&V> {
        self.get(object)
            .ok_or_else(|| Box::new(StdkitError::new(ErrorKind::ObjectNotFound)))
    }

    /// Stores `value` for `object`. An object already present keeps its position.
    pub fn set(&mut self, object: &Arc<K>, value: V) -> Option<V> {
        let id = ObjectId::of(object);
        if let Some(position) = self.positions.get(&id) {
            if let Some((_, slot)) = self.entries.get_mut(position) {
                return Some(std::mem::replace(slot, value));
            }
        }
        let position = self.next_position;
        self.next_position += 1;
        self.positions.insert(id, position);
        self.entries.insert(position, (Arc::clone(object), value));
        None
    }

    /// Removes `object`, returning its value. Removing an absent object does nothing.
    pub fn remove(&mut self, object: &Arc<K>) -> Option<V> {
        let position = self.positions.remove(&ObjectId::of(object))?;
        self.entries.remove(&position).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The stored objects, in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = &Arc<K>> + '_ {
        self.entries.values().map(|(object, _)| object)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<K>, &V)> + '_ {
        self.entries.values().map(|(object, value)| (object, value))
    }
}

impl<K: ?Sized, V: fmt::Debug> fmt::Debug for ObjectStorage<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(object, value)| (Arc::as_ptr(object).cast::<()>(), value)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Node {
        name: &'static str,
    }

    fn node(name: &'static str) -> Arc<Node> {
        Arc::new(Node { name })
    }

    #[test]
    fn test_set_and_get() {
        let mut storage = ObjectStorage::new();
        let a = node("a");
        assert!(!storage.has(&a));
        assert_eq!(storage.get(&a), None);
        storage.set(&a, 1);
        assert!(storage.has(&a));
        assert_eq!(storage.get(&a), Some(&1));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_identity_not_equality() {
        let mut storage = ObjectStorage::new();
        let first = node("same");
        let second = node("same");
        assert_eq!(first, second);
        storage.set(&first, "first");
        assert!(!storage.has(&second));
        assert!(storage.has(&Arc::clone(&first)));
    }

    #[test]
    fn test_get_and_has_are_idempotent() {
        let mut storage = ObjectStorage::new();
        let a = node("a");
        storage.set(&a, 5);
        for _ in 0..3 {
            assert!(storage.has(&a));
            assert_eq!(storage.get(&a), Some(&5));
        }
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_require_missing_object() {
        let storage: ObjectStorage<Node, i32> = ObjectStorage::new();
        let err = storage.require(&node("x")).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ObjectNotFound));
        assert_eq!(err.to_string(), "Object not found.");
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut storage = ObjectStorage::new();
        let (a, b) = (node("a"), node("b"));
        storage.set(&a, 1);
        storage.set(&b, 2);
        assert_eq!(storage.set(&a, 3), Some(1));
        let names: Vec<_> = storage.iter().map(|(o, v)| (o.name, *v)).collect();
        assert_eq!(names, vec![("a", 3), ("b", 2)]);
    }

    #[test]
    fn test_remove() {
        let mut storage = ObjectStorage::new();
        let (a, b) = (node("a"), node("b"));
        storage.set(&a, 1);
        storage.set(&b, 2);
        assert_eq!(storage.remove(&a), Some(1));
        assert_eq!(storage.remove(&a), None);
        assert!(!storage.has(&a));
        let names: Vec<_> = storage.objects().map(|o| o.name).collect();
        assert_eq!(names, vec!["b"]);
        storage.set(&a, 4);
        let names: Vec<_> = storage.objects().map(|o| o.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut storage = ObjectStorage::new();
        let a = node("a");
        storage.set(&a, vec![1]);
        if let Some(values) = storage.get_mut(&a) {
            values.push(2);
        }
        assert_eq!(storage.get(&a), Some(&vec![1, 2]));
    }

    #[test]
    fn test_unsized_keys() {
        let mut storage: ObjectStorage<str, u8> = ObjectStorage::new();
        let key: Arc<str> = Arc::from("key");
        storage.set(&key, 9);
        assert_eq!(storage.get(&key), Some(&9));
        assert!(!storage.has(&Arc::from("key")));
    }
}
