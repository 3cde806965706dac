// Concrete changeset implementations

use crate::history::trait_def::{Changeset, ChangesetError, ChangesetFuture, ChangesetResult};
use crate::store::StateStore;
use crate::surface::{Feature, FeatureId, FeatureLayer};
use futures_util::future;
use futures_util::{FutureExt, TryFutureExt};
use serde_json::Value;
use std::sync::Arc;

/// Changeset for features added to a layer
///
/// `apply` inserts the features, `undo` removes them by id.
pub struct AddFeatures {
    layer: Arc<dyn FeatureLayer>,
    features: Vec<Feature>,
}

impl AddFeatures {
    /// Record features the tool has already inserted
    ///
    /// # Arguments
    /// * `layer` - The layer the features were inserted into
    /// * `features` - Copies of the inserted features
    pub fn new(layer: Arc<dyn FeatureLayer>, features: Vec<Feature>) -> Self {
        Self { layer, features }
    }

    pub fn ids(&self) -> Vec<FeatureId> {
        self.features.iter().map(|f| f.id).collect()
    }
}

impl Changeset for AddFeatures {
    fn apply(&mut self) -> ChangesetFuture<'_> {
        self.layer.upsert(self.features.clone()).err_into().boxed()
    }

    fn undo(&mut self) -> ChangesetFuture<'_> {
        self.layer
            .remove(self.ids())
            .map_ok(|_| ())
            .err_into()
            .boxed()
    }

    fn description(&self) -> String {
        match self.features.as_slice() {
            [single] => format!("Add {}", single.geometry.kind()),
            many => format!("Add {} features", many.len()),
        }
    }
}

/// Changeset for features removed from a layer
///
/// `apply` removes the features, `undo` re-inserts them at their former
/// positions so drawing order and ids are preserved.
pub struct RemoveFeatures {
    layer: Arc<dyn FeatureLayer>,
    removed: Vec<(usize, Feature)>,
}

impl RemoveFeatures {
    /// Record features the tool has already removed
    ///
    /// # Arguments
    /// * `layer` - The layer the features were removed from
    /// * `removed` - Removed features with their former positions, as returned
    ///   by `FeatureLayer::remove`
    pub fn new(layer: Arc<dyn FeatureLayer>, mut removed: Vec<(usize, Feature)>) -> Self {
        removed.sort_by_key(|(position, _)| *position);
        Self { layer, removed }
    }

    pub fn ids(&self) -> Vec<FeatureId> {
        self.removed.iter().map(|(_, f)| f.id).collect()
    }

    async fn remove_again(&mut self) -> ChangesetResult<()> {
        let removed = self.layer.remove(self.ids()).await?;
        // Positions may have shifted since the original removal
        if removed.len() == self.removed.len() {
            self.removed = removed;
        }
        Ok(())
    }
}

impl Changeset for RemoveFeatures {
    fn apply(&mut self) -> ChangesetFuture<'_> {
        self.remove_again().boxed()
    }

    fn undo(&mut self) -> ChangesetFuture<'_> {
        self.layer.restore(self.removed.clone()).err_into().boxed()
    }

    fn description(&self) -> String {
        match self.removed.as_slice() {
            [(_, single)] => format!("Delete {}", single.geometry.kind()),
            many => format!("Delete {} features", many.len()),
        }
    }
}

/// Changeset for a feature whose geometry or properties were replaced
///
/// Keeps full copies of the feature before and after the edit.
pub struct UpdateFeature {
    layer: Arc<dyn FeatureLayer>,
    before: Feature,
    after: Feature,
}

impl UpdateFeature {
    /// Record an edit the tool has already applied
    ///
    /// # Errors
    /// Returns `ChangesetError::Invalid` if `before` and `after` describe
    /// different features.
    pub fn new(
        layer: Arc<dyn FeatureLayer>,
        before: Feature,
        after: Feature,
    ) -> ChangesetResult<Self> {
        if before.id != after.id {
            return Err(ChangesetError::Invalid(format!(
                "cannot update feature {} with data of feature {}",
                before.id, after.id
            )));
        }
        Ok(Self {
            layer,
            before,
            after,
        })
    }
}

impl Changeset for UpdateFeature {
    fn apply(&mut self) -> ChangesetFuture<'_> {
        self.layer.replace(self.after.clone()).err_into().boxed()
    }

    fn undo(&mut self) -> ChangesetFuture<'_> {
        self.layer.replace(self.before.clone()).err_into().boxed()
    }

    fn description(&self) -> String {
        let kind = self.after.geometry.kind();
        if self.before.geometry != self.after.geometry {
            format!("Edit {} geometry", kind)
        } else {
            format!("Edit {} properties", kind)
        }
    }
}

/// Changeset for a state store slice that was set or deleted
pub struct SetStoreValue {
    store: Arc<dyn StateStore>,
    path: String,
    before: Option<Value>,
    after: Option<Value>,
}

impl SetStoreValue {
    /// Record a dispatch the tool has already performed
    ///
    /// # Arguments
    /// * `path` - Store path of the slice
    /// * `before` - Value before the dispatch (`None` if the slice was unset)
    /// * `after` - Value after the dispatch (`None` if the slice was deleted)
    pub fn new(
        store: Arc<dyn StateStore>,
        path: impl Into<String>,
        before: Option<Value>,
        after: Option<Value>,
    ) -> Self {
        Self {
            store,
            path: path.into(),
            before,
            after,
        }
    }
}

impl Changeset for SetStoreValue {
    fn apply(&mut self) -> ChangesetFuture<'_> {
        self.store
            .dispatch(&self.path, self.after.clone())
            .err_into()
            .boxed()
    }

    fn undo(&mut self) -> ChangesetFuture<'_> {
        self.store
            .dispatch(&self.path, self.before.clone())
            .err_into()
            .boxed()
    }

    fn description(&self) -> String {
        match self.after {
            Some(_) => format!("Set {}", self.path),
            None => format!("Clear {}", self.path),
        }
    }
}

/// Callback invoked when a transient interaction is rolled back
pub type Rollback = Box<dyn FnOnce() + Send>;

/// Start marker for an interaction that has not finished yet
///
/// The visible effect of the interaction lives in a temporary overlay, so
/// `apply` does nothing. `undo` runs the rollback callback once (e.g. to abort
/// the in-progress drawing); later calls are no-ops. An undone marker is not
/// kept for redo.
pub struct TransientChangeset {
    label: String,
    rollback: Option<Rollback>,
}

impl TransientChangeset {
    pub fn new(label: impl Into<String>, rollback: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            rollback: Some(Box::new(rollback)),
        }
    }

    /// Whether the rollback callback has already run
    pub fn is_consumed(&self) -> bool {
        self.rollback.is_none()
    }
}

impl Changeset for TransientChangeset {
    fn apply(&mut self) -> ChangesetFuture<'_> {
        future::ready(Ok(())).boxed()
    }

    fn undo(&mut self) -> ChangesetFuture<'_> {
        if let Some(rollback) = self.rollback.take() {
            rollback();
        }
        future::ready(Ok(())).boxed()
    }

    fn description(&self) -> String {
        self.label.clone()
    }

    fn is_redoable(&self) -> bool {
        false
    }
}
