// FeatureLayer trait and the in-memory layer

use crate::surface::feature::{Feature, FeatureId};
use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Result type for layer operations
pub type LayerResult<T> = Result<T, LayerError>;

/// Future returned by layer mutations
///
/// Resolves once the mutation is visible to the renderer.
pub type LayerFuture<'a, T> = BoxFuture<'a, LayerResult<T>>;

/// Errors reported by a feature layer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayerError {
    #[error("Layer '{0}' is not ready for edits")]
    NotReady(String),

    #[error("Feature {0} does not exist in the layer")]
    UnknownFeature(FeatureId),
}

/// A collection of features owned by the rendering surface
///
/// All mutations are idempotent: inserting a feature whose id already exists
/// replaces it in place, and removing a missing id is skipped.
pub trait FeatureLayer: Send + Sync {
    /// Layer name, used in logs and descriptions
    fn name(&self) -> &str;

    /// Append features, replacing in place any feature with the same id
    fn upsert(&self, features: Vec<Feature>) -> LayerFuture<'_, ()>;

    /// Re-insert features at the positions they occupied before removal
    ///
    /// `placed` must be sorted by ascending position, as returned by `remove`.
    fn restore(&self, placed: Vec<(usize, Feature)>) -> LayerFuture<'_, ()>;

    /// Replace an existing feature
    ///
    /// # Errors
    /// Fails with `UnknownFeature` if no feature has the same id.
    fn replace(&self, feature: Feature) -> LayerFuture<'_, ()>;

    /// Remove features by id
    ///
    /// Returns the removed features with their former positions, sorted by
    /// ascending position. Ids not present in the layer are skipped.
    fn remove(&self, ids: Vec<FeatureId>) -> LayerFuture<'_, Vec<(usize, Feature)>>;

    /// Snapshot of a single feature
    fn get(&self, id: FeatureId) -> Option<Feature>;
}

/// In-memory feature layer
///
/// Keeps features in drawing order. Can be switched to a "not ready" state to
/// emulate a rendering surface that rejects edits (e.g. while a style reloads).
pub struct MemoryLayer {
    name: String,
    features: Mutex<Vec<Feature>>,
    ready: AtomicBool,
}

impl MemoryLayer {
    /// Create an empty layer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            features: Mutex::new(Vec::new()),
            ready: AtomicBool::new(true),
        }
    }

    /// Create a layer pre-populated with features
    pub fn with_features(name: impl Into<String>, features: Vec<Feature>) -> Self {
        let layer = Self::new(name);
        *layer.lock() = features;
        layer
    }

    /// Toggle whether the layer accepts edits
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check whether a feature is present
    pub fn contains(&self, id: FeatureId) -> bool {
        self.lock().iter().any(|f| f.id == id)
    }

    /// Feature ids in drawing order
    pub fn ids(&self) -> Vec<FeatureId> {
        self.lock().iter().map(|f| f.id).collect()
    }

    /// Clone of every feature in drawing order
    pub fn snapshot(&self) -> Vec<Feature> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Feature>> {
        self.features.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_ready(&self) -> LayerResult<()> {
        if self.ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LayerError::NotReady(self.name.clone()))
        }
    }

    fn upsert_now(&self, features: Vec<Feature>) -> LayerResult<()> {
        self.check_ready()?;
        let mut stored = self.lock();
        for feature in features {
            match stored.iter_mut().find(|f| f.id == feature.id) {
                Some(existing) => *existing = feature,
                None => stored.push(feature),
            }
        }
        Ok(())
    }

    fn restore_now(&self, placed: Vec<(usize, Feature)>) -> LayerResult<()> {
        self.check_ready()?;
        let mut stored = self.lock();
        for (position, feature) in placed {
            if let Some(existing) = stored.iter_mut().find(|f| f.id == feature.id) {
                *existing = feature;
                continue;
            }
            let position = position.min(stored.len());
            stored.insert(position, feature);
        }
        Ok(())
    }

    fn replace_now(&self, feature: Feature) -> LayerResult<()> {
        self.check_ready()?;
        let mut stored = self.lock();
        let existing = stored
            .iter_mut()
            .find(|f| f.id == feature.id)
            .ok_or(LayerError::UnknownFeature(feature.id))?;
        *existing = feature;
        Ok(())
    }

    fn remove_now(&self, ids: Vec<FeatureId>) -> LayerResult<Vec<(usize, Feature)>> {
        self.check_ready()?;
        let mut stored = self.lock();
        let mut positions: Vec<usize> = stored
            .iter()
            .enumerate()
            .filter(|(_, f)| ids.contains(&f.id))
            .map(|(idx, _)| idx)
            .collect();
        positions.sort_unstable();

        // Remove back to front so earlier positions stay valid
        let mut removed: Vec<(usize, Feature)> = positions
            .iter()
            .rev()
            .map(|&idx| (idx, stored.remove(idx)))
            .collect();
        removed.reverse();
        Ok(removed)
    }
}

impl FeatureLayer for MemoryLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn upsert(&self, features: Vec<Feature>) -> LayerFuture<'_, ()> {
        future::ready(self.upsert_now(features)).boxed()
    }

    fn restore(&self, placed: Vec<(usize, Feature)>) -> LayerFuture<'_, ()> {
        future::ready(self.restore_now(placed)).boxed()
    }

    fn replace(&self, feature: Feature) -> LayerFuture<'_, ()> {
        future::ready(self.replace_now(feature)).boxed()
    }

    fn remove(&self, ids: Vec<FeatureId>) -> LayerFuture<'_, Vec<(usize, Feature)>> {
        future::ready(self.remove_now(ids)).boxed()
    }

    fn get(&self, id: FeatureId) -> Option<Feature> {
        self.lock().iter().find(|f| f.id == id).cloned()
    }
}
