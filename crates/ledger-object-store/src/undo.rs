//! # Undo Stack
//!
//! Each undo state is the change-set of one session: ids created in it,
//! pre-images of objects it modified, objects it removed and the
//! instance counters of the indexes it allocated from.
//!
//! ## Recording rules
//!
//! - **create**: remember the id and, once per index, the counter before
//!   the first allocation.
//! - **modify**: remember the pre-image, unless the object was created in
//!   this session or already has one.
//! - **remove**: forget a created object; otherwise keep the oldest known
//!   image (the pre-image if there is one) for re-insertion.
//!
//! Merging folds the newest state into the one below it following the same
//! rules, so undoing the merged state restores what was there before the
//! older session began.

use crate::index::ErasedObject;
use shared_types::{ObjectId, SpaceTypeId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Default number of committed states kept for popping blocks.
pub const DEFAULT_MAX_UNDO_HISTORY: usize = 1000;

/// Handle of an open undo session. Must be merged, committed or undone.
#[must_use = "an undo session must be merged, committed or undone"]
#[derive(Debug, PartialEq, Eq)]
pub struct UndoSession {
    revision: Option<u64>,
}

impl UndoSession {
    pub(crate) fn active(revision: u64) -> Self {
        Self {
            revision: Some(revision),
        }
    }

    pub(crate) fn inactive() -> Self {
        Self { revision: None }
    }

    /// `None` when undo was disabled as the session started; such a session
    /// records nothing and all its operations are no-ops.
    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    pub fn is_active(&self) -> bool {
        self.revision.is_some()
    }
}

#[derive(Default)]
pub(crate) struct UndoState {
    pub(crate) revision: u64,
    pub(crate) old_values: BTreeMap<ObjectId, ErasedObject>,
    pub(crate) removed: BTreeMap<ObjectId, ErasedObject>,
    pub(crate) new_ids: BTreeSet<ObjectId>,
    pub(crate) old_next_instances: BTreeMap<SpaceTypeId, u64>,
}

impl UndoState {
    fn new(revision: u64) -> Self {
        Self {
            revision,
            ..Default::default()
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.old_values.is_empty()
            && self.removed.is_empty()
            && self.new_ids.is_empty()
            && self.old_next_instances.is_empty()
    }

    /// Folds `newer` into `self`.
    fn absorb(&mut self, newer: UndoState) {
        for (id, old) in newer.old_values {
            if self.new_ids.contains(&id) || self.old_values.contains_key(&id) {
                continue;
            }
            self.old_values.insert(id, old);
        }
        self.new_ids.extend(newer.new_ids);
        for (space_type, next) in newer.old_next_instances {
            self.old_next_instances.entry(space_type).or_insert(next);
        }
        for (id, object) in newer.removed {
            if self.new_ids.remove(&id) {
                continue;
            }
            if let Some(old) = self.old_values.remove(&id) {
                self.removed.insert(id, old);
                continue;
            }
            self.removed.insert(id, object);
        }
    }
}

pub(crate) struct UndoStack {
    states: VecDeque<UndoState>,
    /// Revisions of open sessions, innermost last. Their states are the
    /// topmost ones on `states`.
    open: Vec<u64>,
    enabled: bool,
    next_revision: u64,
    max_size: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self {
            states: VecDeque::new(),
            open: Vec::new(),
            enabled: true,
            next_revision: 1,
            max_size: DEFAULT_MAX_UNDO_HISTORY,
        }
    }
}

impl UndoStack {
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
    }

    pub(crate) fn depth(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn open_sessions(&self) -> usize {
        self.open.len()
    }

    pub(crate) fn clear(&mut self) {
        self.states.clear();
        self.open.clear();
    }

    pub(crate) fn push(&mut self) -> UndoSession {
        let revision = self.next_revision;
        self.next_revision += 1;
        self.states.push_back(UndoState::new(revision));
        self.open.push(revision);
        UndoSession::active(revision)
    }

    /// Checks that `revision` is the innermost open session.
    pub(crate) fn check_innermost(&self, revision: u64) -> Result<(), (u64, Option<u64>)> {
        let innermost = self.open.last().copied();
        let top = self.states.back().map(|state| state.revision);
        if innermost == Some(revision) && top == Some(revision) {
            Ok(())
        } else {
            Err((revision, innermost))
        }
    }

    /// Closes the innermost session and keeps its state as history.
    /// Returns how many old states were trimmed.
    pub(crate) fn commit_top(&mut self) -> usize {
        self.open.pop();
        let mut trimmed = 0;
        while self.states.len() - self.open.len() > self.max_size {
            self.states.pop_front();
            trimmed += 1;
        }
        trimmed
    }

    /// Closes the innermost session and folds it into the state below.
    pub(crate) fn merge_top(&mut self) {
        self.open.pop();
        let Some(top) = self.states.pop_back() else {
            return;
        };
        if let Some(below) = self.states.back_mut() {
            below.absorb(top);
        }
    }

    /// Closes the innermost session and hands back its state for undoing.
    pub(crate) fn pop_top(&mut self) -> Option<UndoState> {
        self.open.pop();
        self.states.pop_back()
    }

    /// Pops the newest committed state; only legal with no open sessions.
    pub(crate) fn pop_committed(&mut self) -> Option<UndoState> {
        debug_assert!(self.open.is_empty());
        self.states.pop_back()
    }

    /// State mutations are recorded into, if any session is open.
    pub(crate) fn recording(&mut self) -> Option<&mut UndoState> {
        if !self.enabled || self.open.is_empty() {
            return None;
        }
        self.states.back_mut()
    }

    pub(crate) fn on_create(&mut self, id: ObjectId, next_instance_before: u64) {
        if let Some(state) = self.recording() {
            state
                .old_next_instances
                .entry(id.space_type())
                .or_insert(next_instance_before);
            state.new_ids.insert(id);
        }
    }

    pub(crate) fn on_modify(&mut self, id: ObjectId, before: impl FnOnce() -> ErasedObject) {
        if let Some(state) = self.recording() {
            if state.new_ids.contains(&id) || state.old_values.contains_key(&id) {
                return;
            }
            state.old_values.insert(id, before());
        }
    }

    pub(crate) fn on_remove(&mut self, id: ObjectId, removed: impl FnOnce() -> ErasedObject) {
        if let Some(state) = self.recording() {
            if state.new_ids.remove(&id) {
                return;
            }
            if let Some(old) = state.old_values.remove(&id) {
                state.removed.insert(id, old);
                return;
            }
            state.removed.insert(id, removed());
        }
    }
}
