// Drawing tool - multi-step interaction with a transient history marker
//
// State machine:
//   Idle --begin--> Drawing --confirm--> Idle (one AddFeatures entry)
//                   Drawing --abort----> Idle (rollback ran, no entry left)
//
// While drawing, the shape lives in a temporary overlay. A transient marker
// sits on top of the undo stack so that pressing undo mid-drawing aborts the
// drawing instead of undoing an unrelated earlier edit.

use crate::history::{
    AddFeatures, DomainKey, EntryId, HistoryError, HistoryRegistry, TransientChangeset,
};
use crate::surface::{Feature, FeatureId, FeatureLayer, LayerError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result type for drawing operations
pub type DrawResult<T> = Result<T, DrawError>;

/// Drawing tool errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DrawError {
    #[error("No drawing in progress")]
    NotDrawing,

    /// The marker left history (undone or cleared) before the drawing was confirmed
    #[error("Drawing {0} was cancelled before it was confirmed")]
    Aborted(EntryId),

    /// Another entry was recorded above the marker, so undo cannot reach it
    #[error("Drawing marker {0} is not the most recent history entry")]
    MarkerNotOnTop(EntryId),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Layer(#[from] LayerError),
}

/// Where the interaction currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawState {
    Idle,
    Drawing { marker: EntryId },
}

/// One drawing interaction on a layer
pub struct DrawInteraction {
    registry: Arc<HistoryRegistry>,
    layer: Arc<dyn FeatureLayer>,
    key: DomainKey,
    marker: Option<EntryId>,
}

impl DrawInteraction {
    pub fn new(
        registry: Arc<HistoryRegistry>,
        layer: Arc<dyn FeatureLayer>,
        key: DomainKey,
    ) -> Self {
        Self {
            registry,
            layer,
            key,
            marker: None,
        }
    }

    pub fn state(&self) -> DrawState {
        match self.marker {
            Some(marker) => DrawState::Drawing { marker },
            None => DrawState::Idle,
        }
    }

    /// Start drawing
    ///
    /// Registers a transient marker whose undo runs `rollback` (which should
    /// discard the overlay). A drawing already in progress is aborted first.
    ///
    /// # Errors
    /// Fails if the previous drawing could not be aborted.
    pub async fn begin(
        &mut self,
        label: impl Into<String>,
        rollback: impl FnOnce() + Send + 'static,
    ) -> DrawResult<EntryId> {
        if self.marker.is_some() {
            self.abort().await?;
        }
        let marker = self
            .registry
            .register(self.key, TransientChangeset::new(label, rollback));
        self.marker = Some(marker);
        debug!(domain = %self.key, %marker, "drawing started");
        Ok(marker)
    }

    /// Finish drawing with the shapes the user produced
    ///
    /// Inserts the features into the layer, drops the marker and records a
    /// single entry for the whole interaction. If the layer rejects the
    /// insert, the drawing stays in progress.
    ///
    /// # Errors
    /// - `NotDrawing` if no drawing is in progress
    /// - `Aborted` if the marker was undone or cleared meanwhile; the layer is
    ///   left as it was and the interaction is over
    /// - the layer's error
    pub async fn confirm(&mut self, features: Vec<Feature>) -> DrawResult<EntryId> {
        let marker = self.marker.ok_or(DrawError::NotDrawing)?;
        if !self.registry.entries(self.key).iter().any(|e| e.id == marker) {
            return Err(self.cancelled(marker));
        }
        self.layer.upsert(features.clone()).await?;

        // The marker can still be undone while the layer is busy
        if !self.registry.remove(self.key, marker) {
            let ids: Vec<FeatureId> = features.iter().map(|f| f.id).collect();
            self.layer.remove(ids).await?;
            return Err(self.cancelled(marker));
        }
        self.marker = None;
        let entry = self
            .registry
            .register(self.key, AddFeatures::new(self.layer.clone(), features));
        debug!(domain = %self.key, layer = self.layer.name(), %entry, "drawing confirmed");
        Ok(entry)
    }

    /// Cancel drawing by undoing the marker, which runs the rollback
    ///
    /// # Errors
    /// - `NotDrawing` if no drawing is in progress
    /// - `MarkerNotOnTop` if another edit was recorded after the marker
    /// - `History` if the undo was rejected; the drawing stays in progress
    pub async fn abort(&mut self) -> DrawResult<()> {
        let marker = self.marker.ok_or(DrawError::NotDrawing)?;

        let entries = self.registry.entries(self.key);
        let marker_present = entries.iter().any(|e| e.id == marker);
        if marker_present && entries.last().map(|e| e.id) != Some(marker) {
            return Err(DrawError::MarkerNotOnTop(marker));
        }
        if marker_present {
            self.registry.undo(self.key).await?;
        }
        // A missing marker means the history was cleared meanwhile

        self.marker = None;
        debug!(domain = %self.key, %marker, "drawing aborted");
        Ok(())
    }

    fn cancelled(&mut self, marker: EntryId) -> DrawError {
        self.marker = None;
        warn!(domain = %self.key, %marker, "drawing marker left history before confirm");
        DrawError::Aborted(marker)
    }
}
