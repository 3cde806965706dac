// Undo/redo history engine
//
// Every editing tool records its edits here so they can be reversed and
// replayed. All state-changing edits should be recorded as a Changeset.
//
// Architecture:
// - Changeset trait: apply(), undo(), description() as async operations
// - Timeline: bounded undo/redo stacks for one domain
// - HistoryRegistry: one Timeline per DomainKey, the only entry point for
//   tools and triggers; serializes undo/redo per domain
// - Concrete changesets: AddFeatures, RemoveFeatures, UpdateFeature,
//   SetStoreValue, TransientChangeset
// - TriggerAdapter: shortcuts and toolbar controls
//
// Tools perform their edit before registering it. The registry only stores
// the changeset; it runs undo()/apply() later when a trigger asks for it.

pub mod changesets;
pub mod config;
pub mod domain;
pub mod registry;
pub mod timeline;
pub mod trait_def;
pub mod trigger;

pub use changesets::{
    AddFeatures, RemoveFeatures, Rollback, SetStoreValue, TransientChangeset, UpdateFeature,
};
pub use config::{ConfigError, HistoryConfig};
pub use domain::DomainKey;
pub use registry::{HistoryError, HistoryOutcome, HistoryRegistry, HistoryResult, HistoryStatus};
pub use timeline::{EntryId, EntryInfo, Timeline};
pub use trait_def::{Changeset, ChangesetError, ChangesetFuture, ChangesetResult};
pub use trigger::{ControlState, HistoryAction, KeyChord, TriggerAdapter};
