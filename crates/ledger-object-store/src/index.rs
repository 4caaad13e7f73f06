//! # Generic Index
//!
//! One [`GenericIndex`] per object type. It owns the objects by instance,
//! allocates instance numbers and fans every mutation out to its secondary
//! indexes, in registration order.
//!
//! Reads are public. Mutations are crate-private: they only happen through
//! [`ObjectDatabase`](crate::ObjectDatabase), which records undo state.

use crate::errors::DbError;
use crate::image::IndexImage;
use crate::object::Object;
use shared_types::{codec, ObjectId, SpaceTypeId, TypedId};
use std::any::Any;
use std::collections::BTreeMap;

/// Type-erased object as kept in undo states.
pub(crate) type ErasedObject = Box<dyn Any + Send + Sync>;

/// Observer of one index's mutations.
///
/// `validate_*` run before the primary map changes and may veto it.
/// The notification hooks run after validation succeeded and must not
/// fail. They also run while undoing, where keys can transiently collide;
/// implementations must tolerate that (insert overwrites, removal only
/// drops a key that still points at the removed object).
pub trait SecondaryIndex<T: Object>: Any + Send + Sync {
    fn validate_insert(&self, _object: &T) -> Result<(), DbError> {
        Ok(())
    }

    fn validate_modify(&self, _before: &T, _after: &T) -> Result<(), DbError> {
        Ok(())
    }

    fn object_inserted(&mut self, object: &T);

    fn object_modified(&mut self, before: &T, after: &T);

    fn object_removed(&mut self, object: &T);

    fn as_any(&self) -> &dyn Any;
}

pub struct GenericIndex<T: Object> {
    objects: BTreeMap<u64, T>,
    next_instance: u64,
    secondary: Vec<Box<dyn SecondaryIndex<T>>>,
}

impl<T: Object> Default for GenericIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Object> GenericIndex<T> {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            next_instance: 0,
            secondary: Vec::new(),
        }
    }

    pub fn get(&self, id: T::Id) -> Result<&T, DbError> {
        self.find(id).ok_or_else(|| DbError::NotFound(id.object_id()))
    }

    pub fn find(&self, id: T::Id) -> Option<&T> {
        self.objects.get(&id.instance())
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.objects.contains_key(&id.instance())
    }

    /// Objects in id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Id the next created object will receive.
    pub fn next_id(&self) -> T::Id {
        T::Id::from_instance(self.next_instance)
    }

    /// Registered secondary index of type `S`, if any.
    pub fn secondary<S: SecondaryIndex<T>>(&self) -> Option<&S> {
        self.secondary
            .iter()
            .find_map(|index| index.as_any().downcast_ref::<S>())
    }

    pub(crate) fn next_instance(&self) -> u64 {
        self.next_instance
    }

    pub(crate) fn add_secondary(&mut self, mut index: Box<dyn SecondaryIndex<T>>) {
        for object in self.objects.values() {
            index.object_inserted(object);
        }
        self.secondary.push(index);
    }

    pub(crate) fn insert_new(&mut self, build: impl FnOnce(T::Id) -> T) -> Result<&T, DbError> {
        let id = self.next_id();
        let object = build(id);
        if object.id() != id {
            return Err(DbError::IdMutated {
                before: id.object_id(),
                after: object.id().object_id(),
            });
        }
        for index in &self.secondary {
            index.validate_insert(&object)?;
        }
        self.next_instance += 1;
        for index in &mut self.secondary {
            index.object_inserted(&object);
        }
        Ok(self.objects.entry(id.instance()).or_insert(object))
    }

    /// Applies `mutate` and returns the pre-image.
    pub(crate) fn modify(&mut self, id: T::Id, mutate: impl FnOnce(&mut T)) -> Result<T, DbError> {
        let current = self
            .objects
            .get_mut(&id.instance())
            .ok_or_else(|| DbError::NotFound(id.object_id()))?;
        let mut updated = current.clone();
        mutate(&mut updated);
        if updated.id() != id {
            return Err(DbError::IdMutated {
                before: id.object_id(),
                after: updated.id().object_id(),
            });
        }
        for index in &self.secondary {
            index.validate_modify(current, &updated)?;
        }
        for index in &mut self.secondary {
            index.object_modified(current, &updated);
        }
        Ok(std::mem::replace(current, updated))
    }

    pub(crate) fn remove(&mut self, id: T::Id) -> Result<T, DbError> {
        let object = self
            .objects
            .remove(&id.instance())
            .ok_or_else(|| DbError::NotFound(id.object_id()))?;
        for index in &mut self.secondary {
            index.object_removed(&object);
        }
        Ok(object)
    }

    fn downcast(value: ErasedObject) -> Result<T, DbError> {
        value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| DbError::TypeMismatch(T::Id::space_type()))
    }
}

/// Operations the database needs on an index without knowing its type.
pub(crate) trait AnyIndex: Send + Sync {
    fn next_instance(&self) -> u64;

    fn set_next_instance(&mut self, next: u64);

    /// Drops a created object while undoing.
    fn remove_instance(&mut self, instance: u64) -> Result<(), DbError>;

    /// Puts back the pre-image of a modified object.
    fn restore(&mut self, value: ErasedObject) -> Result<(), DbError>;

    /// Re-inserts a removed object under its original id.
    fn reinsert(&mut self, value: ErasedObject) -> Result<(), DbError>;

    fn export(&self) -> Result<IndexImage, DbError>;

    fn import(&mut self, image: &IndexImage) -> Result<(), DbError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Object> AnyIndex for GenericIndex<T> {
    fn next_instance(&self) -> u64 {
        self.next_instance
    }

    fn set_next_instance(&mut self, next: u64) {
        self.next_instance = next;
    }

    fn remove_instance(&mut self, instance: u64) -> Result<(), DbError> {
        self.remove(T::Id::from_instance(instance)).map(|_| ())
    }

    fn restore(&mut self, value: ErasedObject) -> Result<(), DbError> {
        let previous = Self::downcast(value)?;
        let current = self
            .objects
            .get_mut(&previous.id().instance())
            .ok_or_else(|| DbError::NotFound(previous.id().object_id()))?;
        for index in &mut self.secondary {
            index.object_modified(current, &previous);
        }
        *current = previous;
        Ok(())
    }

    fn reinsert(&mut self, value: ErasedObject) -> Result<(), DbError> {
        let object = Self::downcast(value)?;
        let instance = object.id().instance();
        if self.objects.contains_key(&instance) {
            return Err(DbError::InstanceOccupied(object.id().object_id()));
        }
        for index in &mut self.secondary {
            index.object_inserted(&object);
        }
        self.objects.insert(instance, object);
        Ok(())
    }

    fn export(&self) -> Result<IndexImage, DbError> {
        let space_type = T::Id::space_type();
        let objects = self
            .objects
            .values()
            .map(codec::pack)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(IndexImage {
            space: space_type.space,
            type_id: space_type.type_id,
            next_instance: self.next_instance,
            objects,
        })
    }

    fn import(&mut self, image: &IndexImage) -> Result<(), DbError> {
        let mut objects = BTreeMap::new();
        for bytes in &image.objects {
            let object: T = codec::unpack(bytes)?;
            let instance = object.id().instance();
            if instance >= image.next_instance {
                return Err(DbError::ImageMismatch(format!(
                    "{} is beyond next instance {}",
                    object.id(),
                    image.next_instance
                )));
            }
            if objects.insert(instance, object).is_some() {
                return Err(DbError::InstanceOccupied(ObjectId::new(
                    image.space,
                    image.type_id,
                    instance,
                )));
            }
        }
        for index in &mut self.secondary {
            for object in self.objects.values() {
                index.object_removed(object);
            }
            for object in objects.values() {
                index.object_inserted(object);
            }
        }
        self.objects = objects;
        self.next_instance = image.next_instance;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Partition an index is registered under.
pub(crate) fn space_type_of<T: Object>() -> SpaceTypeId {
    T::Id::space_type()
}
