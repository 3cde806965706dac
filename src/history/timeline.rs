// Timeline - Bounded undo/redo stacks for one editing domain

use crate::history::trait_def::{Changeset, ChangesetFuture, ChangesetResult};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;

/// Default maximum number of changesets to keep in history
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Identifies a registered changeset
///
/// Handed out by the registry on `register` so that tools can later remove a
/// transient marker without undoing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read-only view of a timeline entry, for history panels
#[derive(Debug, Clone, PartialEq)]
pub struct EntryInfo {
    pub id: EntryId,
    pub description: String,
    pub recorded_at: DateTime<Utc>,
}

struct Entry {
    id: EntryId,
    changeset: Box<dyn Changeset>,
    recorded_at: DateTime<Utc>,
}

impl Entry {
    fn info(&self) -> EntryInfo {
        EntryInfo {
            id: self.id,
            description: self.changeset.description(),
            recorded_at: self.recorded_at,
        }
    }
}

/// Which way a pending operation moves through history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Undo,
    Redo,
}

/// A changeset taken off a stack while its effect runs
///
/// Created by `Timeline::take_undo`/`take_redo` and handed back with
/// `Timeline::settle` once the effect has completed or failed. The counters
/// record what the timeline looked like at take time, so settlement can tell
/// whether the timeline was edited or cleared meanwhile.
pub struct Pending {
    entry: Entry,
    direction: Direction,
    pushes: u64,
    clears: u64,
}

impl Pending {
    /// Run the changeset in this pending operation's direction
    pub fn run(&mut self) -> ChangesetFuture<'_> {
        match self.direction {
            Direction::Undo => self.entry.changeset.undo(),
            Direction::Redo => self.entry.changeset.apply(),
        }
    }

    pub fn description(&self) -> String {
        self.entry.changeset.description()
    }
}

/// Where a pending changeset ended up after settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Undone and now redoable
    MovedToRedo,
    /// Redone and now undoable
    MovedToUndo,
    /// Failed and put back where it was taken from
    Restored,
    /// Dropped (not redoable, or its stack was invalidated meanwhile)
    Discarded,
}

/// Undo/redo history for one domain
///
/// Maintains two stacks:
/// - Undo stack: Changesets that are in effect and can be undone
/// - Redo stack: Changesets that have been undone and can be redone
///
/// Pushing a new changeset clears the redo stack. The undo stack never holds
/// more than `max_depth` entries; the oldest entry is evicted silently.
///
/// Entry ids must increase with every push. The undo stack is then always
/// ordered by id, which is what settlement uses to put an entry back.
pub struct Timeline {
    /// Most recent at the back
    undo_stack: VecDeque<Entry>,

    /// Most recent at the back
    redo_stack: VecDeque<Entry>,

    max_depth: usize,

    // Monotonic counters used to settle pending operations
    pushes: u64,
    clears: u64,
}

impl Timeline {
    /// Create a timeline with the default depth
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Create a timeline keeping at most `max_depth` undo steps (minimum 1)
    pub fn with_max_depth(max_depth: usize) -> Self {
        let max_depth = max_depth.max(1);
        Self {
            undo_stack: VecDeque::with_capacity(max_depth.min(DEFAULT_MAX_DEPTH)),
            redo_stack: VecDeque::new(),
            max_depth,
            pushes: 0,
            clears: 0,
        }
    }

    /// Record an already-applied changeset
    ///
    /// This will:
    /// 1. Add it to the undo stack
    /// 2. Clear the redo stack (new branch)
    /// 3. Evict the oldest entries if over capacity
    ///
    /// Returns the number of evicted entries.
    pub fn push(&mut self, id: EntryId, changeset: Box<dyn Changeset>) -> usize {
        self.undo_stack.push_back(Entry {
            id,
            changeset,
            recorded_at: Utc::now(),
        });
        self.redo_stack.clear();
        self.pushes += 1;
        self.enforce_depth()
    }

    /// Take the most recent undoable changeset off the stack
    ///
    /// Returns `None` if there is nothing to undo.
    pub fn take_undo(&mut self) -> Option<Pending> {
        let entry = self.undo_stack.pop_back()?;
        Some(self.pending(entry, Direction::Undo))
    }

    /// Take the most recent redoable changeset off the stack
    ///
    /// Returns `None` if there is nothing to redo.
    pub fn take_redo(&mut self) -> Option<Pending> {
        let entry = self.redo_stack.pop_back()?;
        Some(self.pending(entry, Direction::Redo))
    }

    fn pending(&self, entry: Entry, direction: Direction) -> Pending {
        Pending {
            entry,
            direction,
            pushes: self.pushes,
            clears: self.clears,
        }
    }

    /// Hand a pending changeset back once its effect has settled
    ///
    /// On success the changeset crosses to the other stack. On failure it goes
    /// back to the slot it was taken from so the operation can be retried.
    /// That slot is found by id, so entries evicted, removed or pushed in the
    /// meantime keep their order around it.
    /// A clear while pending discards it; a push while pending discards an
    /// undone changeset and a failed redo, since the redo branch they belong
    /// to no longer exists.
    pub fn settle(&mut self, pending: Pending, succeeded: bool) -> Settlement {
        let cleared = pending.clears != self.clears;
        let edited = pending.pushes != self.pushes;
        let entry = pending.entry;
        let slot = self.undo_stack.partition_point(|e| e.id < entry.id);

        if cleared {
            return Settlement::Discarded;
        }

        match (pending.direction, succeeded) {
            (Direction::Undo, true) => {
                if edited || !entry.changeset.is_redoable() {
                    Settlement::Discarded
                } else {
                    self.redo_stack.push_back(entry);
                    Settlement::MovedToRedo
                }
            }
            (Direction::Undo, false) => {
                self.insert_undo(slot, entry);
                Settlement::Restored
            }
            (Direction::Redo, true) => {
                self.insert_undo(slot, entry);
                Settlement::MovedToUndo
            }
            (Direction::Redo, false) => {
                if edited {
                    Settlement::Discarded
                } else {
                    self.redo_stack.push_back(entry);
                    Settlement::Restored
                }
            }
        }
    }

    /// Undo the most recent changeset
    ///
    /// Returns the description of the undone changeset, or `None` if there
    /// was nothing to undo. On failure the changeset stays on the undo stack.
    ///
    /// # Errors
    /// Returns the changeset's error if its `undo` fails.
    pub async fn undo(&mut self) -> ChangesetResult<Option<String>> {
        match self.take_undo() {
            Some(pending) => self.drive(pending).await.map(Some),
            None => Ok(None),
        }
    }

    /// Redo the most recently undone changeset
    ///
    /// Returns the description of the redone changeset, or `None` if there
    /// was nothing to redo. On failure the changeset stays on the redo stack.
    ///
    /// # Errors
    /// Returns the changeset's error if its `apply` fails.
    pub async fn redo(&mut self) -> ChangesetResult<Option<String>> {
        match self.take_redo() {
            Some(pending) => self.drive(pending).await.map(Some),
            None => Ok(None),
        }
    }

    async fn drive(&mut self, mut pending: Pending) -> ChangesetResult<String> {
        let description = pending.description();
        let result = pending.run().await;
        self.settle(pending, result.is_ok());
        result.map(|()| description)
    }

    /// Remove an entry from the undo stack without running it
    ///
    /// Other entries keep their relative order. Returns false if the entry is
    /// not on the undo stack.
    pub fn remove(&mut self, id: EntryId) -> bool {
        match self.undo_stack.iter().position(|e| e.id == id) {
            Some(idx) => {
                self.undo_stack.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Drop all history without running any changeset
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.clears += 1;
    }

    /// Check if there are changesets that can be undone
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if there are changesets that can be redone
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get a description of the changeset that would be undone
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|e| e.changeset.description())
    }

    /// Get a description of the changeset that would be redone
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.back().map(|e| e.changeset.description())
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Undoable entries, oldest first
    pub fn entries(&self) -> Vec<EntryInfo> {
        self.undo_stack.iter().map(Entry::info).collect()
    }

    fn insert_undo(&mut self, slot: usize, entry: Entry) {
        self.undo_stack.insert(slot, entry);
        self.enforce_depth();
    }

    fn enforce_depth(&mut self) -> usize {
        let mut evicted = 0;
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
            evicted += 1;
        }
        evicted
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("undo_count", &self.undo_stack.len())
            .field("redo_count", &self.redo_stack.len())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::trait_def::ChangesetError;
    use futures_util::FutureExt;
    use futures_util::future;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
    use std::sync::Arc;

    // Adds `delta` to a shared counter; can be told to fail
    struct MockChangeset {
        delta: i32,
        value: Arc<AtomicI32>,
        fail: Arc<AtomicBool>,
        applied: bool,
    }

    impl MockChangeset {
        fn new(delta: i32, value: &Arc<AtomicI32>, fail: &Arc<AtomicBool>) -> Box<Self> {
            value.fetch_add(delta, Ordering::SeqCst);
            Box::new(Self {
                delta,
                value: value.clone(),
                fail: fail.clone(),
                applied: true,
            })
        }

        fn step(&mut self, forward: bool) -> ChangesetResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ChangesetError::UndoFailed("mock failure".into()));
            }
            if self.applied != forward {
                let delta = if forward { self.delta } else { -self.delta };
                self.value.fetch_add(delta, Ordering::SeqCst);
                self.applied = forward;
            }
            Ok(())
        }
    }

    impl Changeset for MockChangeset {
        fn apply(&mut self) -> ChangesetFuture<'_> {
            future::ready(self.step(true)).boxed()
        }

        fn undo(&mut self) -> ChangesetFuture<'_> {
            future::ready(self.step(false)).boxed()
        }

        fn description(&self) -> String {
            format!("Add {}", self.delta)
        }
    }

    fn fixture() -> (Arc<AtomicI32>, Arc<AtomicBool>) {
        (Arc::new(AtomicI32::new(0)), Arc::new(AtomicBool::new(false)))
    }

    #[tokio::test]
    async fn test_push() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::new();
        timeline.push(EntryId(1), MockChangeset::new(42, &value, &fail));

        assert_eq!(timeline.undo_count(), 1);
        assert_eq!(timeline.redo_count(), 0);
        assert!(timeline.can_undo());
        assert!(!timeline.can_redo());
        assert_eq!(timeline.undo_description().as_deref(), Some("Add 42"));
    }

    #[tokio::test]
    async fn test_undo_then_redo() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::new();
        timeline.push(EntryId(1), MockChangeset::new(42, &value, &fail));

        let description = timeline.undo().await.unwrap();
        assert_eq!(description.as_deref(), Some("Add 42"));
        assert_eq!(value.load(Ordering::SeqCst), 0);
        assert_eq!(timeline.undo_count(), 0);
        assert_eq!(timeline.redo_count(), 1);

        let description = timeline.redo().await.unwrap();
        assert_eq!(description.as_deref(), Some("Add 42"));
        assert_eq!(value.load(Ordering::SeqCst), 42);
        assert_eq!(timeline.undo_count(), 1);
        assert_eq!(timeline.redo_count(), 0);
    }

    #[tokio::test]
    async fn test_redo_stack_cleared_on_push() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::new();
        timeline.push(EntryId(1), MockChangeset::new(1, &value, &fail));
        timeline.undo().await.unwrap();
        assert!(timeline.can_redo());

        timeline.push(EntryId(2), MockChangeset::new(2, &value, &fail));
        assert!(!timeline.can_redo());
        assert_eq!(timeline.redo_count(), 0);
    }

    #[tokio::test]
    async fn test_depth_limit_evicts_oldest() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::with_max_depth(3);
        let mut evicted = 0;
        for i in 0..5 {
            evicted += timeline.push(EntryId(i), MockChangeset::new(1, &value, &fail));
        }

        assert_eq!(evicted, 2);
        assert_eq!(timeline.undo_count(), 3);
        let ids: Vec<EntryId> = timeline.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![EntryId(2), EntryId(3), EntryId(4)]);
    }

    #[test]
    fn test_zero_depth_is_clamped() {
        let timeline = Timeline::with_max_depth(0);
        assert_eq!(timeline.max_depth(), 1);
    }

    #[tokio::test]
    async fn test_undo_with_empty_stack() {
        let mut timeline = Timeline::new();
        assert_eq!(timeline.undo().await.unwrap(), None);
        assert_eq!(timeline.redo().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_undo_keeps_changeset() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::new();
        timeline.push(EntryId(1), MockChangeset::new(5, &value, &fail));
        timeline.push(EntryId(2), MockChangeset::new(7, &value, &fail));

        fail.store(true, Ordering::SeqCst);
        assert!(timeline.undo().await.is_err());
        assert_eq!(timeline.undo_count(), 2);
        assert_eq!(timeline.redo_count(), 0);
        assert_eq!(timeline.undo_description().as_deref(), Some("Add 7"));

        // Retry succeeds once the failure clears
        fail.store(false, Ordering::SeqCst);
        assert_eq!(timeline.undo().await.unwrap().as_deref(), Some("Add 7"));
        assert_eq!(value.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_failed_redo_keeps_changeset() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::new();
        timeline.push(EntryId(1), MockChangeset::new(5, &value, &fail));
        timeline.undo().await.unwrap();

        fail.store(true, Ordering::SeqCst);
        assert!(timeline.redo().await.is_err());
        assert_eq!(timeline.undo_count(), 0);
        assert_eq!(timeline.redo_count(), 1);
    }

    #[tokio::test]
    async fn test_remove_keeps_relative_order() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::new();
        for i in 1..=3 {
            timeline.push(EntryId(i), MockChangeset::new(1, &value, &fail));
        }

        assert!(timeline.remove(EntryId(2)));
        assert!(!timeline.remove(EntryId(2)));
        let ids: Vec<EntryId> = timeline.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![EntryId(1), EntryId(3)]);
        // Removal does not run the changeset
        assert_eq!(value.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_clear_does_not_run_changesets() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::new();
        timeline.push(EntryId(1), MockChangeset::new(1, &value, &fail));
        timeline.push(EntryId(2), MockChangeset::new(1, &value, &fail));
        timeline.undo().await.unwrap();

        timeline.clear();
        assert!(!timeline.can_undo());
        assert!(!timeline.can_redo());
        assert_eq!(value.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_settle_after_push_discards_undone() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::new();
        timeline.push(EntryId(1), MockChangeset::new(1, &value, &fail));

        let mut pending = timeline.take_undo().unwrap();
        pending.run().await.unwrap();
        timeline.push(EntryId(2), MockChangeset::new(2, &value, &fail));

        assert_eq!(timeline.settle(pending, true), Settlement::Discarded);
        assert!(!timeline.can_redo());
        assert_eq!(timeline.undo_count(), 1);
    }

    #[tokio::test]
    async fn test_settle_failed_undo_after_push_restores_below() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::new();
        timeline.push(EntryId(1), MockChangeset::new(1, &value, &fail));

        let pending = timeline.take_undo().unwrap();
        timeline.push(EntryId(2), MockChangeset::new(2, &value, &fail));

        assert_eq!(timeline.settle(pending, false), Settlement::Restored);
        let ids: Vec<EntryId> = timeline.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![EntryId(1), EntryId(2)]);
    }

    #[tokio::test]
    async fn test_settle_after_clear_discards() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::new();
        timeline.push(EntryId(1), MockChangeset::new(1, &value, &fail));

        let pending = timeline.take_undo().unwrap();
        timeline.clear();

        assert_eq!(timeline.settle(pending, false), Settlement::Discarded);
        assert!(!timeline.can_undo());
    }

    #[tokio::test]
    async fn test_settle_accounts_for_eviction() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::with_max_depth(2);
        timeline.push(EntryId(1), MockChangeset::new(1, &value, &fail));
        timeline.push(EntryId(2), MockChangeset::new(1, &value, &fail));

        // Taken from slot 1; two pushes meanwhile evict entry 1
        let pending = timeline.take_undo().unwrap();
        timeline.push(EntryId(3), MockChangeset::new(1, &value, &fail));
        timeline.push(EntryId(4), MockChangeset::new(1, &value, &fail));

        assert_eq!(timeline.settle(pending, false), Settlement::Restored);
        let ids: Vec<EntryId> = timeline.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![EntryId(3), EntryId(4)]);
        assert_eq!(timeline.undo_count(), 2);
    }

    #[tokio::test]
    async fn test_settle_failed_undo_after_remove_below() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::new();
        for i in 1..=3 {
            timeline.push(EntryId(i), MockChangeset::new(1, &value, &fail));
        }

        // Entry 3 is in flight; entry 1 goes away and entry 4 lands on top
        let pending = timeline.take_undo().unwrap();
        assert!(timeline.remove(EntryId(1)));
        timeline.push(EntryId(4), MockChangeset::new(1, &value, &fail));

        assert_eq!(timeline.settle(pending, false), Settlement::Restored);
        let ids: Vec<EntryId> = timeline.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![EntryId(2), EntryId(3), EntryId(4)]);
        assert_eq!(timeline.undo_description().as_deref(), Some("Add 1"));
    }

    #[tokio::test]
    async fn test_settle_redo_after_remove_below() {
        let (value, fail) = fixture();
        let mut timeline = Timeline::new();
        for i in 1..=3 {
            timeline.push(EntryId(i), MockChangeset::new(1, &value, &fail));
        }
        timeline.undo().await.unwrap();

        let mut pending = timeline.take_redo().unwrap();
        assert!(timeline.remove(EntryId(1)));
        timeline.push(EntryId(4), MockChangeset::new(1, &value, &fail));
        pending.run().await.unwrap();

        assert_eq!(timeline.settle(pending, true), Settlement::MovedToUndo);
        let ids: Vec<EntryId> = timeline.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![EntryId(2), EntryId(3), EntryId(4)]);
    }
}
