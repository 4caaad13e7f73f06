//! Reusable secondary indexes keyed by a function of the object.

use crate::errors::DbError;
use crate::index::SecondaryIndex;
use crate::object::Object;
use shared_types::TypedId;
use std::any::Any;
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// Key → id map that rejects a second object with the same key.
pub struct UniqueIndex<T: Object, K> {
    name: &'static str,
    key_of: fn(&T) -> K,
    entries: BTreeMap<K, T::Id>,
}

impl<T: Object, K: Ord + Clone + Send + Sync + 'static> UniqueIndex<T, K> {
    pub fn new(name: &'static str, key_of: fn(&T) -> K) -> Self {
        Self {
            name,
            key_of,
            entries: BTreeMap::new(),
        }
    }

    pub fn find<Q>(&self, key: &Q) -> Option<T::Id>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &T::Id)> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_if_owned(&mut self, key: &K, id: T::Id) {
        if self.entries.get(key) == Some(&id) {
            self.entries.remove(key);
        }
    }
}

impl<T: Object, K: Ord + Clone + Send + Sync + 'static> SecondaryIndex<T> for UniqueIndex<T, K> {
    fn validate_insert(&self, object: &T) -> Result<(), DbError> {
        match self.entries.get(&(self.key_of)(object)) {
            Some(existing) => Err(DbError::UniqueViolation {
                index: self.name,
                existing: existing.object_id(),
            }),
            None => Ok(()),
        }
    }

    fn validate_modify(&self, _before: &T, after: &T) -> Result<(), DbError> {
        match self.entries.get(&(self.key_of)(after)) {
            Some(existing) if *existing != after.id() => Err(DbError::UniqueViolation {
                index: self.name,
                existing: existing.object_id(),
            }),
            _ => Ok(()),
        }
    }

    fn object_inserted(&mut self, object: &T) {
        self.entries.insert((self.key_of)(object), object.id());
    }

    fn object_modified(&mut self, before: &T, after: &T) {
        let old_key = (self.key_of)(before);
        let new_key = (self.key_of)(after);
        if old_key != new_key {
            self.remove_if_owned(&old_key, before.id());
        }
        self.entries.insert(new_key, after.id());
    }

    fn object_removed(&mut self, object: &T) {
        let key = (self.key_of)(object);
        self.remove_if_owned(&key, object.id());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Ordered `(key, id)` set; many objects may share a key.
pub struct OrderedIndex<T: Object, K> {
    key_of: fn(&T) -> K,
    entries: BTreeSet<(K, T::Id)>,
}

impl<T: Object, K: Ord + Clone + Send + Sync + 'static> OrderedIndex<T, K> {
    pub fn new(key_of: fn(&T) -> K) -> Self {
        Self {
            key_of,
            entries: BTreeSet::new(),
        }
    }

    /// All entries in key order, ties broken by id.
    pub fn iter(&self) -> impl Iterator<Item = &(K, T::Id)> + '_ {
        self.entries.iter()
    }

    pub fn first(&self) -> Option<&(K, T::Id)> {
        self.entries.iter().next()
    }

    /// Entries whose key is at most `key`.
    pub fn up_to(&self, key: &K) -> impl Iterator<Item = &(K, T::Id)> + '_ {
        let upper = (key.clone(), T::Id::from_instance(u64::MAX));
        self.entries.range((Bound::Unbounded, Bound::Included(upper)))
    }

    /// Entries whose key is at least `key`.
    pub fn starting_at(&self, key: &K) -> impl Iterator<Item = &(K, T::Id)> + '_ {
        let lower = (key.clone(), T::Id::from_instance(0));
        self.entries.range((Bound::Included(lower), Bound::Unbounded))
    }

    /// Ids of every object with exactly `key`.
    pub fn equal(&self, key: &K) -> impl Iterator<Item = T::Id> + '_ {
        let wanted = key.clone();
        self.starting_at(key)
            .take_while(move |(k, _)| *k == wanted)
            .map(|(_, id)| *id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Object, K: Ord + Clone + Send + Sync + 'static> SecondaryIndex<T> for OrderedIndex<T, K> {
    fn object_inserted(&mut self, object: &T) {
        self.entries.insert(((self.key_of)(object), object.id()));
    }

    fn object_modified(&mut self, before: &T, after: &T) {
        self.entries.remove(&((self.key_of)(before), before.id()));
        self.entries.insert(((self.key_of)(after), after.id()));
    }

    fn object_removed(&mut self, object: &T) {
        self.entries.remove(&((self.key_of)(object), object.id()));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
