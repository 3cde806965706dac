// HistoryRegistry - Owns one timeline per domain and serializes undo/redo

use crate::history::config::HistoryConfig;
use crate::history::domain::DomainKey;
use crate::history::timeline::{Direction, EntryId, EntryInfo, Pending, Settlement, Timeline};
use crate::history::trait_def::{Changeset, ChangesetError};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Result type for registry operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Errors surfaced by undo/redo
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HistoryError {
    /// Another undo/redo for the same domain has not settled yet
    #[error("History for '{0}' is busy")]
    Busy(DomainKey),

    #[error("Undo in '{key}' failed: {source}")]
    UndoFailed {
        key: DomainKey,
        #[source]
        source: ChangesetError,
    },

    #[error("Redo in '{key}' failed: {source}")]
    RedoFailed {
        key: DomainKey,
        #[source]
        source: ChangesetError,
    },
}

/// Successful result of an undo/redo request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOutcome {
    Undone { description: String },
    Redone { description: String },
    /// The stack was empty (or the domain has no history yet)
    NothingToDo,
}

/// Snapshot of one domain's history, for driving UI controls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStatus {
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_description: Option<String>,
    pub redo_description: Option<String>,
    pub undo_count: usize,
    pub redo_count: usize,
    pub busy: bool,
}

#[derive(Default)]
struct RegistryState {
    timelines: HashMap<DomainKey, Timeline>,
    in_flight: HashSet<DomainKey>,
    next_entry: u64,
}

/// Entry point for recording and replaying edits
///
/// One registry is created per editing session and shared (by reference or
/// `Arc`) with the tools that record changesets and the controls that trigger
/// undo/redo. Timelines are created on first registration and are never
/// handed out.
///
/// Undo and redo are asynchronous. While one is in flight for a domain, a
/// second request for the same domain is rejected with `HistoryError::Busy`.
/// Requests for other domains proceed independently. Registration is never
/// blocked.
pub struct HistoryRegistry {
    config: HistoryConfig,
    state: Mutex<RegistryState>,
}

impl HistoryRegistry {
    /// Create a registry with default settings
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    /// Create a registry with custom history depths
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Record a changeset whose effect the caller has already applied
    ///
    /// Clears the domain's redo stack. Returns an id that can be passed to
    /// `remove`.
    pub fn register(&self, key: DomainKey, changeset: impl Changeset + 'static) -> EntryId {
        self.register_boxed(key, Box::new(changeset))
    }

    /// Same as `register`, for changesets that are already boxed
    pub fn register_boxed(&self, key: DomainKey, changeset: Box<dyn Changeset>) -> EntryId {
        let description = changeset.description();
        let mut state = self.lock();
        state.next_entry += 1;
        let id = EntryId(state.next_entry);

        let max_depth = self.config.max_depth_for(key);
        let evicted = state
            .timelines
            .entry(key)
            .or_insert_with(|| Timeline::with_max_depth(max_depth))
            .push(id, changeset);

        debug!(domain = %key, entry = %id, %description, "registered changeset");
        if evicted > 0 {
            debug!(domain = %key, evicted, "history depth reached, evicted oldest entries");
        }
        id
    }

    /// Drop a registered changeset without undoing it
    ///
    /// Used to discard a transient start marker once its interaction has been
    /// confirmed. Returns false if the entry is not on the undo stack.
    pub fn remove(&self, key: DomainKey, id: EntryId) -> bool {
        let removed = self
            .lock()
            .timelines
            .get_mut(&key)
            .is_some_and(|timeline| timeline.remove(id));
        debug!(domain = %key, entry = %id, removed, "remove changeset");
        removed
    }

    /// Undo the most recent changeset of a domain
    ///
    /// # Errors
    /// - `Busy` if an undo/redo for `key` is still in flight
    /// - `UndoFailed` if the changeset could not be reverted; it stays on the
    ///   undo stack for a retry
    pub async fn undo(&self, key: DomainKey) -> HistoryResult<HistoryOutcome> {
        self.run(key, Direction::Undo).await
    }

    /// Redo the most recently undone changeset of a domain
    ///
    /// # Errors
    /// - `Busy` if an undo/redo for `key` is still in flight
    /// - `RedoFailed` if the changeset could not be re-applied; it stays on the
    ///   redo stack for a retry
    pub async fn redo(&self, key: DomainKey) -> HistoryResult<HistoryOutcome> {
        self.run(key, Direction::Redo).await
    }

    async fn run(&self, key: DomainKey, direction: Direction) -> HistoryResult<HistoryOutcome> {
        let Some(pending) = self.begin(key, direction)? else {
            debug!(domain = %key, ?direction, "nothing to do");
            return Ok(HistoryOutcome::NothingToDo);
        };

        let mut flight = InFlight {
            registry: self,
            key,
            pending: Some(pending),
            released: false,
        };
        let (description, result) = match flight.pending.as_mut() {
            Some(pending) => (pending.description(), pending.run().await),
            None => return Ok(HistoryOutcome::NothingToDo),
        };
        let settlement = flight.settle(result.is_ok());

        match result {
            Ok(()) => {
                debug!(domain = %key, ?direction, %description, ?settlement, "history step done");
                Ok(match direction {
                    Direction::Undo => HistoryOutcome::Undone { description },
                    Direction::Redo => HistoryOutcome::Redone { description },
                })
            }
            Err(source) => {
                warn!(domain = %key, ?direction, %description, error = %source, "history step failed");
                Err(match direction {
                    Direction::Undo => HistoryError::UndoFailed { key, source },
                    Direction::Redo => HistoryError::RedoFailed { key, source },
                })
            }
        }
    }

    // Claims the domain and takes the changeset to run, under one lock
    fn begin(&self, key: DomainKey, direction: Direction) -> HistoryResult<Option<Pending>> {
        let mut state = self.lock();
        if state.in_flight.contains(&key) {
            warn!(domain = %key, ?direction, "rejected: history busy");
            return Err(HistoryError::Busy(key));
        }

        let pending = state
            .timelines
            .get_mut(&key)
            .and_then(|timeline| match direction {
                Direction::Undo => timeline.take_undo(),
                Direction::Redo => timeline.take_redo(),
            });
        if pending.is_some() {
            state.in_flight.insert(key);
        }
        Ok(pending)
    }

    /// Check if the domain has changesets that can be undone
    ///
    /// Unknown domains report false.
    pub fn can_undo(&self, key: DomainKey) -> bool {
        self.lock()
            .timelines
            .get(&key)
            .is_some_and(Timeline::can_undo)
    }

    /// Check if the domain has changesets that can be redone
    ///
    /// Unknown domains report false.
    pub fn can_redo(&self, key: DomainKey) -> bool {
        self.lock()
            .timelines
            .get(&key)
            .is_some_and(Timeline::can_redo)
    }

    /// Check if an undo/redo is in flight for the domain
    pub fn is_busy(&self, key: DomainKey) -> bool {
        self.lock().in_flight.contains(&key)
    }

    /// Capability flags and labels for one domain
    pub fn status(&self, key: DomainKey) -> HistoryStatus {
        let state = self.lock();
        let busy = state.in_flight.contains(&key);
        match state.timelines.get(&key) {
            Some(timeline) => HistoryStatus {
                can_undo: timeline.can_undo(),
                can_redo: timeline.can_redo(),
                undo_description: timeline.undo_description(),
                redo_description: timeline.redo_description(),
                undo_count: timeline.undo_count(),
                redo_count: timeline.redo_count(),
                busy,
            },
            None => HistoryStatus {
                busy,
                ..HistoryStatus::default()
            },
        }
    }

    /// Undoable entries of a domain, oldest first
    pub fn entries(&self, key: DomainKey) -> Vec<EntryInfo> {
        self.lock()
            .timelines
            .get(&key)
            .map(Timeline::entries)
            .unwrap_or_default()
    }

    /// Discard a domain's history without running any changeset
    ///
    /// Must be called before the domain's state is replaced wholesale (e.g.
    /// when a project is loaded) so stale changesets cannot be undone later.
    pub fn clear(&self, key: DomainKey) {
        if let Some(timeline) = self.lock().timelines.get_mut(&key) {
            timeline.clear();
        }
        debug!(domain = %key, "history cleared");
    }

    /// Discard the history of every domain
    pub fn clear_all(&self) {
        let mut state = self.lock();
        for timeline in state.timelines.values_mut() {
            timeline.clear();
        }
        debug!(domains = state.timelines.len(), "all history cleared");
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HistoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds a domain's in-flight claim while its changeset runs
///
/// The claim is released exactly once, by `settle` or on drop. If the
/// operation never settled (the undo/redo future was dropped mid-way), the
/// changeset is put back as if it had failed.
struct InFlight<'a> {
    registry: &'a HistoryRegistry,
    key: DomainKey,
    pending: Option<Pending>,
    released: bool,
}

impl InFlight<'_> {
    fn settle(&mut self, succeeded: bool) -> Settlement {
        let mut state = self.registry.lock();
        let settlement = match (self.pending.take(), state.timelines.get_mut(&self.key)) {
            (Some(pending), Some(timeline)) => timeline.settle(pending, succeeded),
            _ => Settlement::Discarded,
        };
        state.in_flight.remove(&self.key);
        self.released = true;
        settlement
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.released {
            warn!(domain = %self.key, "history step cancelled before completion");
            self.settle(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::trait_def::{ChangesetFuture, ChangesetResult};
    use futures_util::FutureExt;
    use futures_util::future;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI32, Ordering};

    struct Counter {
        delta: i32,
        value: Arc<AtomicI32>,
    }

    impl Counter {
        fn set(&self, forward: bool) -> ChangesetResult<()> {
            let delta = if forward { self.delta } else { 0 };
            self.value.store(delta, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Changeset for Counter {
        fn apply(&mut self) -> ChangesetFuture<'_> {
            future::ready(self.set(true)).boxed()
        }

        fn undo(&mut self) -> ChangesetFuture<'_> {
            future::ready(self.set(false)).boxed()
        }

        fn description(&self) -> String {
            format!("Set {}", self.delta)
        }
    }

    struct Failing;

    impl Changeset for Failing {
        fn apply(&mut self) -> ChangesetFuture<'_> {
            future::ready(Err(ChangesetError::ApplyFailed("boom".into()))).boxed()
        }

        fn undo(&mut self) -> ChangesetFuture<'_> {
            future::ready(Err(ChangesetError::UndoFailed("boom".into()))).boxed()
        }

        fn description(&self) -> String {
            "Failing".into()
        }
    }

    #[tokio::test]
    async fn test_register_undo_redo() {
        let registry = HistoryRegistry::new();
        let value = Arc::new(AtomicI32::new(3));
        registry.register(
            DomainKey::Map,
            Counter {
                delta: 3,
                value: value.clone(),
            },
        );
        assert!(registry.can_undo(DomainKey::Map));

        let outcome = registry.undo(DomainKey::Map).await.unwrap();
        assert_eq!(
            outcome,
            HistoryOutcome::Undone {
                description: "Set 3".into()
            }
        );
        assert_eq!(value.load(Ordering::SeqCst), 0);
        assert!(registry.can_redo(DomainKey::Map));

        let outcome = registry.redo(DomainKey::Map).await.unwrap();
        assert_eq!(
            outcome,
            HistoryOutcome::Redone {
                description: "Set 3".into()
            }
        );
        assert_eq!(value.load(Ordering::SeqCst), 3);
        assert!(!registry.can_redo(DomainKey::Map));
    }

    #[tokio::test]
    async fn test_unknown_domain() {
        let registry = HistoryRegistry::new();
        assert!(!registry.can_undo(DomainKey::Layout));
        assert!(!registry.can_redo(DomainKey::Layout));
        assert_eq!(
            registry.undo(DomainKey::Layout).await.unwrap(),
            HistoryOutcome::NothingToDo
        );
        assert_eq!(
            registry.redo(DomainKey::Layout).await.unwrap(),
            HistoryOutcome::NothingToDo
        );
        assert_eq!(registry.status(DomainKey::Layout), HistoryStatus::default());
        assert!(registry.entries(DomainKey::Layout).is_empty());
        assert!(!registry.remove(DomainKey::Layout, EntryId(1)));
    }

    #[tokio::test]
    async fn test_failure_surfaces_and_keeps_entry() {
        let registry = HistoryRegistry::new();
        registry.register(DomainKey::Map, Failing);

        let result = registry.undo(DomainKey::Map).await;
        assert!(matches!(
            result,
            Err(HistoryError::UndoFailed {
                key: DomainKey::Map,
                ..
            })
        ));
        assert!(registry.can_undo(DomainKey::Map));
        assert!(!registry.can_redo(DomainKey::Map));
        assert!(!registry.is_busy(DomainKey::Map));
    }

    #[tokio::test]
    async fn test_status_reports_descriptions() {
        let registry = HistoryRegistry::new();
        let value = Arc::new(AtomicI32::new(0));
        registry.register(DomainKey::Map, Counter { delta: 1, value: value.clone() });
        registry.register(DomainKey::Map, Counter { delta: 2, value });
        registry.undo(DomainKey::Map).await.unwrap();

        let status = registry.status(DomainKey::Map);
        assert!(status.can_undo);
        assert!(status.can_redo);
        assert_eq!(status.undo_description.as_deref(), Some("Set 1"));
        assert_eq!(status.redo_description.as_deref(), Some("Set 2"));
        assert_eq!(status.undo_count, 1);
        assert_eq!(status.redo_count, 1);
        assert!(!status.busy);
    }

    #[tokio::test]
    async fn test_entry_ids_are_unique_across_domains() {
        let registry = HistoryRegistry::new();
        let value = Arc::new(AtomicI32::new(0));
        let a = registry.register(DomainKey::Map, Counter { delta: 1, value: value.clone() });
        let b = registry.register(DomainKey::Layout, Counter { delta: 1, value });
        assert_ne!(a, b);
        // An id from one domain does not remove anything from another
        assert!(!registry.remove(DomainKey::Map, b));
        assert!(registry.remove(DomainKey::Layout, b));
    }

    #[tokio::test]
    async fn test_configured_depth_per_domain() {
        let config = HistoryConfig::default().with_domain_depth(DomainKey::Layout, 2);
        let registry = HistoryRegistry::with_config(config);
        let value = Arc::new(AtomicI32::new(0));
        for i in 0..5 {
            registry.register(DomainKey::Layout, Counter { delta: i, value: value.clone() });
            registry.register(DomainKey::Map, Counter { delta: i, value: value.clone() });
        }
        assert_eq!(registry.status(DomainKey::Layout).undo_count, 2);
        assert_eq!(registry.status(DomainKey::Map).undo_count, 5);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let registry = HistoryRegistry::new();
        let value = Arc::new(AtomicI32::new(0));
        registry.register(DomainKey::Map, Counter { delta: 1, value: value.clone() });
        registry.register(DomainKey::Layout, Counter { delta: 1, value });
        registry.clear_all();
        for key in DomainKey::ALL {
            assert!(!registry.can_undo(key));
            assert!(!registry.can_redo(key));
        }
    }
}
