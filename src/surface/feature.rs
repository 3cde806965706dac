// Feature types stored in map layers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Unique identifier for a map feature
pub type FeatureId = Uuid;

/// Generate a fresh feature identifier
pub fn generate_feature_id() -> FeatureId {
    Uuid::new_v4()
}

/// Geometry of a feature, in map coordinates (lon, lat)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
    /// Outer ring first, then holes
    Polygon(Vec<Vec<[f64; 2]>>),
}

impl Geometry {
    /// Number of vertices across all parts of the geometry
    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Point(_) => 1,
            Geometry::LineString(points) => points.len(),
            Geometry::Polygon(rings) => rings.iter().map(Vec::len).sum(),
        }
    }

    /// Short label used in changeset descriptions
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "point",
            Geometry::LineString(_) => "line",
            Geometry::Polygon(_) => "polygon",
        }
    }
}

/// A drawable map feature
///
/// Features own all of their data. Changesets keep clones of features rather
/// than references into a layer, so editing the live feature afterwards never
/// alters what an undo step restores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Create a feature with a fresh id and no properties
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: generate_feature_id(),
            geometry,
            properties: Map::new(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Get a property value
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}
