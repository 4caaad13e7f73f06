//! # Object Database
//!
//! Registry of typed indexes plus the undo stack. All mutations go through
//! here so that every create, modify and remove is recorded into the
//! innermost open session.
//!
//! ## Sessions
//!
//! ```text
//! start_undo_session ──► mutations ──┬─► merge_session   (fold into parent)
//!                                    ├─► commit_session  (keep as history)
//!                                    └─► undo_session    (revert)
//! ```
//!
//! Sessions nest and must be closed innermost first. Committed sessions
//! stay on the stack, bounded by the configured history size, and can be
//! popped later with [`ObjectDatabase::undo_last_revision`].

use crate::errors::DbError;
use crate::image::DatabaseImage;
use crate::index::{space_type_of, AnyIndex, ErasedObject, GenericIndex, SecondaryIndex};
use crate::object::Object;
use crate::undo::{UndoSession, UndoStack, UndoState};
use shared_types::{SpaceTypeId, TypedId};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Deref, DerefMut};
use tracing::{debug, error};

type IndexMap = BTreeMap<SpaceTypeId, Box<dyn AnyIndex>>;

#[derive(Default)]
pub struct ObjectDatabase {
    indexes: IndexMap,
    undo: UndoStack,
}

fn typed<T: Object>(indexes: &IndexMap) -> Result<&GenericIndex<T>, DbError> {
    let space_type = space_type_of::<T>();
    indexes
        .get(&space_type)
        .ok_or(DbError::IndexNotRegistered(space_type))?
        .as_any()
        .downcast_ref::<GenericIndex<T>>()
        .ok_or(DbError::TypeMismatch(space_type))
}

fn typed_mut<T: Object>(indexes: &mut IndexMap) -> Result<&mut GenericIndex<T>, DbError> {
    let space_type = space_type_of::<T>();
    indexes
        .get_mut(&space_type)
        .ok_or(DbError::IndexNotRegistered(space_type))?
        .as_any_mut()
        .downcast_mut::<GenericIndex<T>>()
        .ok_or(DbError::TypeMismatch(space_type))
}

impl ObjectDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // INDEX REGISTRATION
    // =========================================================================

    /// Registers the primary index for `T`.
    pub fn add_index<T: Object>(&mut self) -> Result<(), DbError> {
        let space_type = space_type_of::<T>();
        if self.indexes.contains_key(&space_type) {
            return Err(DbError::IndexAlreadyRegistered(space_type));
        }
        self.indexes
            .insert(space_type, Box::new(GenericIndex::<T>::new()));
        Ok(())
    }

    /// Attaches a secondary index to `T`'s index, populated from the
    /// objects already present.
    pub fn add_secondary_index<T: Object, S: SecondaryIndex<T>>(
        &mut self,
        index: S,
    ) -> Result<(), DbError> {
        typed_mut::<T>(&mut self.indexes)?.add_secondary(Box::new(index));
        Ok(())
    }

    pub fn index<T: Object>(&self) -> Result<&GenericIndex<T>, DbError> {
        typed::<T>(&self.indexes)
    }

    pub fn registered_indexes(&self) -> impl Iterator<Item = SpaceTypeId> + '_ {
        self.indexes.keys().copied()
    }

    // =========================================================================
    // OBJECTS
    // =========================================================================

    pub fn get<T: Object>(&self, id: T::Id) -> Result<&T, DbError> {
        self.index::<T>()?.get(id)
    }

    /// Like [`get`](Self::get) but `None` for a missing object. An
    /// unregistered index still yields `None`.
    pub fn find<T: Object>(&self, id: T::Id) -> Option<&T> {
        self.index::<T>().ok()?.find(id)
    }

    /// Allocates the next id of `T`'s index and stores what `build` makes
    /// of it.
    pub fn create<T: Object>(&mut self, build: impl FnOnce(T::Id) -> T) -> Result<&T, DbError> {
        let index = typed_mut::<T>(&mut self.indexes)?;
        let next_before = index.next_instance();
        let object = index.insert_new(build)?;
        self.undo.on_create(object.id().object_id(), next_before);
        Ok(object)
    }

    /// Applies `mutate` to a copy of the object and stores the result.
    /// The id must not change.
    pub fn modify<T: Object>(
        &mut self,
        id: T::Id,
        mutate: impl FnOnce(&mut T),
    ) -> Result<&T, DbError> {
        let index = typed_mut::<T>(&mut self.indexes)?;
        let before = index.modify(id, mutate)?;
        self.undo
            .on_modify(id.object_id(), move || -> ErasedObject { Box::new(before) });
        index.get(id)
    }

    pub fn remove<T: Object>(&mut self, id: T::Id) -> Result<T, DbError> {
        let removed = typed_mut::<T>(&mut self.indexes)?.remove(id)?;
        self.undo
            .on_remove(id.object_id(), || -> ErasedObject { Box::new(removed.clone()) });
        Ok(removed)
    }

    // =========================================================================
    // UNDO
    // =========================================================================

    /// Opens a nested session. With `enabled == false`, or while undo is
    /// disabled, the returned session is inactive: nothing is recorded for
    /// it and closing it is a no-op.
    pub fn start_undo_session(&mut self, enabled: bool) -> UndoSession {
        if !enabled || !self.undo.is_enabled() {
            return UndoSession::inactive();
        }
        let session = self.undo.push();
        debug!(
            revision = ?session.revision(),
            depth = self.undo.open_sessions(),
            "Undo session started"
        );
        session
    }

    /// Closes the session, keeping its changes both in the database and on
    /// the undo history.
    pub fn commit_session(&mut self, session: UndoSession) -> Result<(), DbError> {
        let Some(revision) = self.innermost(&session)? else {
            return Ok(());
        };
        let trimmed = self.undo.commit_top();
        if trimmed > 0 {
            debug!(revision, trimmed, "Trimmed undo history");
        }
        Ok(())
    }

    /// Closes the session, folding its changes into the enclosing one.
    pub fn merge_session(&mut self, session: UndoSession) -> Result<(), DbError> {
        if self.innermost(&session)?.is_some() {
            self.undo.merge_top();
        }
        Ok(())
    }

    /// Closes the session, reverting every change made in it.
    pub fn undo_session(&mut self, session: UndoSession) -> Result<(), DbError> {
        let Some(revision) = self.innermost(&session)? else {
            return Ok(());
        };
        if let Some(state) = self.undo.pop_top() {
            self.apply_undo(state)?;
        }
        debug!(revision, "Undo session reverted");
        Ok(())
    }

    /// Reverts the newest committed session. No session may be open.
    pub fn undo_last_revision(&mut self) -> Result<(), DbError> {
        let open = self.undo.open_sessions();
        if open > 0 {
            return Err(DbError::ActiveSessions(open));
        }
        let state = self.undo.pop_committed().ok_or(DbError::NoUndoHistory)?;
        let revision = state.revision;
        self.apply_undo(state)?;
        debug!(revision, remaining = self.undo.depth(), "Popped undo revision");
        Ok(())
    }

    /// Runs `f` in a nested session: merged on `Ok`, undone on `Err`.
    pub fn with_undo_session<R, E>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<DbError>,
    {
        let session = self.start_undo_session(true);
        match f(self) {
            Ok(value) => {
                self.merge_session(session)?;
                Ok(value)
            }
            Err(err) => {
                self.undo_session(session)?;
                Err(err)
            }
        }
    }

    /// Opens a session that is undone when the guard drops, unless it was
    /// merged or committed first.
    pub fn guarded_session(&mut self) -> UndoGuard<'_> {
        let session = self.start_undo_session(true);
        UndoGuard {
            db: self,
            session: Some(session),
        }
    }

    pub fn enable_undo(&mut self) {
        self.undo.set_enabled(true);
    }

    /// Stops recording and discards the history. Fails while sessions are
    /// open.
    pub fn disable_undo(&mut self) -> Result<(), DbError> {
        let open = self.undo.open_sessions();
        if open > 0 {
            return Err(DbError::ActiveSessions(open));
        }
        self.undo.clear();
        self.undo.set_enabled(false);
        Ok(())
    }

    pub fn undo_enabled(&self) -> bool {
        self.undo.is_enabled()
    }

    /// Bound on committed states kept for [`undo_last_revision`](Self::undo_last_revision).
    pub fn set_max_undo_size(&mut self, max_size: usize) {
        self.undo.set_max_size(max_size);
    }

    /// States on the stack, open sessions included.
    pub fn undo_depth(&self) -> usize {
        self.undo.depth()
    }

    pub fn active_sessions(&self) -> usize {
        self.undo.open_sessions()
    }

    fn innermost(&self, session: &UndoSession) -> Result<Option<u64>, DbError> {
        let Some(revision) = session.revision() else {
            return Ok(None);
        };
        self.undo
            .check_innermost(revision)
            .map_err(|(session, innermost)| DbError::SessionOutOfOrder { session, innermost })?;
        Ok(Some(revision))
    }

    fn index_for(&mut self, space_type: SpaceTypeId) -> Result<&mut Box<dyn AnyIndex>, DbError> {
        self.indexes
            .get_mut(&space_type)
            .ok_or(DbError::IndexNotRegistered(space_type))
    }

    fn apply_undo(&mut self, state: UndoState) -> Result<(), DbError> {
        if state.is_empty() {
            return Ok(());
        }
        for id in &state.new_ids {
            self.index_for(id.space_type())?
                .remove_instance(id.instance())?;
        }
        for (id, old) in state.old_values {
            self.index_for(id.space_type())?.restore(old)?;
        }
        for (space_type, next) in state.old_next_instances {
            self.index_for(space_type)?.set_next_instance(next);
        }
        for (id, object) in state.removed {
            self.index_for(id.space_type())?.reinsert(object)?;
        }
        Ok(())
    }

    // =========================================================================
    // IMAGES
    // =========================================================================

    /// Packs every index into a [`DatabaseImage`].
    pub fn export_image(&self) -> Result<DatabaseImage, DbError> {
        let indexes = self
            .indexes
            .values()
            .map(|index| index.export())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DatabaseImage { indexes })
    }

    /// Replaces the content of every index with the image. The image must
    /// cover exactly the registered indexes. Undo history is discarded.
    pub fn import_image(&mut self, image: &DatabaseImage) -> Result<(), DbError> {
        let open = self.undo.open_sessions();
        if open > 0 {
            return Err(DbError::ActiveSessions(open));
        }
        let registered: BTreeSet<SpaceTypeId> = self.indexes.keys().copied().collect();
        let imaged: BTreeSet<SpaceTypeId> =
            image.indexes.iter().map(|index| index.space_type()).collect();
        if registered != imaged || imaged.len() != image.indexes.len() {
            return Err(DbError::ImageMismatch(format!(
                "image covers {} indexes, {} registered",
                image.indexes.len(),
                registered.len()
            )));
        }

        let backup = self.export_image()?;
        if let Err(err) = self.import_unchecked(image) {
            if let Err(restore_err) = self.import_unchecked(&backup) {
                error!(error = %restore_err, "Failed to restore database after bad image");
            }
            return Err(err);
        }
        self.undo.clear();
        debug!(objects = image.object_count(), "Imported database image");
        Ok(())
    }

    fn import_unchecked(&mut self, image: &DatabaseImage) -> Result<(), DbError> {
        for index_image in &image.indexes {
            self.index_for(index_image.space_type())?
                .import(index_image)?;
        }
        Ok(())
    }
}

// =============================================================================
// GUARD
// =============================================================================

/// Session owned by a scope. Dropping the guard undoes the session.
pub struct UndoGuard<'a> {
    db: &'a mut ObjectDatabase,
    session: Option<UndoSession>,
}

impl UndoGuard<'_> {
    /// Folds the changes into the enclosing session.
    pub fn commit(mut self) -> Result<(), DbError> {
        match self.session.take() {
            Some(session) => self.db.merge_session(session),
            None => Ok(()),
        }
    }

    /// Keeps the changes as a committed undo revision.
    pub fn keep(mut self) -> Result<(), DbError> {
        match self.session.take() {
            Some(session) => self.db.commit_session(session),
            None => Ok(()),
        }
    }
}

impl Deref for UndoGuard<'_> {
    type Target = ObjectDatabase;

    fn deref(&self) -> &ObjectDatabase {
        self.db
    }
}

impl DerefMut for UndoGuard<'_> {
    fn deref_mut(&mut self) -> &mut ObjectDatabase {
        self.db
    }
}

impl Drop for UndoGuard<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(err) = self.db.undo_session(session) {
                error!(error = %err, "Failed to undo guarded session");
            }
        }
    }
}

impl std::fmt::Debug for ObjectDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectDatabase")
            .field("indexes", &self.indexes.keys().collect::<Vec<_>>())
            .field("undo_depth", &self.undo.depth())
            .field("active_sessions", &self.undo.open_sessions())
            .finish()
    }
}
