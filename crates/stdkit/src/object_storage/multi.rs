use std::sync::Arc;

use super::ObjectStorage;

/// Map from object identity to a list of values that grows with each [`add`](Self::add).
#[derive(Debug)]
pub struct ObjectArrayStorage<K: ?Sized, V> {
    storage: ObjectStorage<K, Vec<V>>,
}

impl<K: ?Sized, V> Default for ObjectArrayStorage<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ?Sized, V> ObjectArrayStorage<K, V> {
    pub fn new() -> Self {
        Self {
            storage: ObjectStorage::new(),
        }
    }

    pub fn has(&self, object: &Arc<K>) -> bool {
        self.storage.has(object)
    }

    /// The values added for `object`; empty when it was never added.
    pub fn get(&self, object: &Arc<K>) -> &[V] {
        self.storage.get(object).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add(&mut self, object: &Arc<K>, value: V) {
        match self.storage.get_mut(object) {
            Some(values) => values.push(value),
            None => {
                self.storage.set(object, vec![value]);
            }
        }
    }

    /// Drops every value associated with `object`.
    pub fn remove(&mut self, object: &Arc<K>) -> Vec<V> {
        self.storage.remove(object).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<K>, &[V])> + '_ {
        self.storage
            .iter()
            .map(|(object, values)| (object, values.as_slice()))
    }
}
