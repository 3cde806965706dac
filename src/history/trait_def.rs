// Changeset trait definition

use crate::store::StoreError;
use crate::surface::LayerError;
use futures_util::future::BoxFuture;

/// Result type for changeset operations
pub type ChangesetResult<T> = Result<T, ChangesetError>;

/// Future returned by `Changeset::apply` and `Changeset::undo`
pub type ChangesetFuture<'a> = BoxFuture<'a, ChangesetResult<()>>;

/// Errors that can occur while applying or reverting a changeset
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChangesetError {
    /// Forward effect could not be completed
    #[error("Apply failed: {0}")]
    ApplyFailed(String),

    /// Reverse effect could not be completed
    #[error("Undo failed: {0}")]
    UndoFailed(String),

    /// The rendering surface rejected the mutation
    #[error("Layer error: {0}")]
    Layer(#[from] LayerError),

    /// The state store rejected the mutation
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The changeset was constructed from inconsistent data
    #[error("Invalid changeset: {0}")]
    Invalid(String),

    /// The operation was dropped before it completed
    #[error("Operation cancelled before completion")]
    Cancelled,
}

/// A reversible unit of work
///
/// Tools perform their edit first, then describe it with a changeset and hand
/// it to the history registry. `apply` replays the edit, `undo` reverses it.
///
/// # Contract
/// - Both operations are idempotent: calling `apply` twice in a row leaves the
///   same state as calling it once, and likewise for `undo`.
/// - A failed operation must leave the external state as it was, so the
///   history can keep the changeset for a retry.
/// - Changesets own copies of the state they restore. They never keep live
///   references into mutable surface objects.
///
/// # Example
/// ```no_run
/// use mapforge::history::{Changeset, ChangesetFuture};
/// use futures_util::FutureExt;
///
/// struct Rename {
///     before: String,
///     after: String,
///     target: std::sync::Arc<std::sync::Mutex<String>>,
/// }
///
/// impl Changeset for Rename {
///     fn apply(&mut self) -> ChangesetFuture<'_> {
///         let target = self.target.clone();
///         let value = self.after.clone();
///         async move {
///             *target.lock().unwrap() = value;
///             Ok(())
///         }
///         .boxed()
///     }
///
///     fn undo(&mut self) -> ChangesetFuture<'_> {
///         let target = self.target.clone();
///         let value = self.before.clone();
///         async move {
///             *target.lock().unwrap() = value;
///             Ok(())
///         }
///         .boxed()
///     }
///
///     fn description(&self) -> String {
///         format!("Rename to {}", self.after)
///     }
/// }
/// ```
pub trait Changeset: Send {
    /// Perform the forward effect
    ///
    /// Resolves once the effect is visible to the renderer and the store.
    fn apply(&mut self) -> ChangesetFuture<'_>;

    /// Reverse the effect
    fn undo(&mut self) -> ChangesetFuture<'_>;

    /// Human-readable label (e.g. "Add 2 features")
    ///
    /// Used for UI display ("Undo: Add 2 features") and logs.
    fn description(&self) -> String;

    /// Whether an undone changeset should move to the redo stack
    ///
    /// Markers for interactions that were abandoned return false so that
    /// undoing them leaves nothing to redo.
    fn is_redoable(&self) -> bool {
        true
    }
}
