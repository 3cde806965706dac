// MapForge - Library exports for the editor, tests and benchmarks

pub mod history;
pub mod messaging;
pub mod store;
pub mod surface;
pub mod tools;

// Re-export commonly used types for convenience
pub use history::{
    Changeset, ChangesetError, DomainKey, EntryId, HistoryAction, HistoryConfig, HistoryError,
    HistoryOutcome, HistoryRegistry, KeyChord, TriggerAdapter,
};
pub use messaging::{Notification, NotificationLevel, create_notification_channel};
pub use store::{MemoryStore, StateStore};
pub use surface::{Feature, FeatureId, FeatureLayer, Geometry, MemoryLayer};
pub use tools::DrawInteraction;
