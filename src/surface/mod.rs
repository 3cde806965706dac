// Rendering surface model
//
// The map editor draws features from layers owned by the rendering surface.
// The history engine never reaches into the renderer directly; it goes through
// the FeatureLayer trait so changesets can be replayed against any backend.
// MemoryLayer is the in-process implementation used by tools, tests and demos.

pub mod feature;
pub mod layer;

pub use feature::{Feature, FeatureId, Geometry, generate_feature_id};
pub use layer::{FeatureLayer, LayerError, LayerFuture, LayerResult, MemoryLayer};
