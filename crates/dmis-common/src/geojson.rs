//! GeoJSON types produced by the dmis services.
//!
//! Every geospatial payload the services hand to map clients is a GeoJSON
//! FeatureCollection, optionally carrying a named CRS member so projected
//! coordinates keep their spatial reference.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DmisError, DmisResult};

/// Spatial reference applied when a payload does not name one.
pub const DEFAULT_WKID: i32 = 3857;

/// A position as [x, y] (or [longitude, latitude] for geographic CRS).
pub type Position = [f64; 2];

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    /// Named coordinate reference system, when the source data declared one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crs: Option<Crs>,

    /// Array of features.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Create a new empty FeatureCollection.
    pub fn new() -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            crs: None,
            features: Vec::new(),
        }
    }

    /// Add a feature to the collection.
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    /// Add multiple features to the collection.
    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features.extend(features);
        self
    }

    /// Attach a named CRS member for the given well-known id.
    pub fn attach_crs(mut self, wkid: i32) -> Self {
        self.crs = Some(Crs::named(wkid));
        self
    }

    /// Check the structural invariants of every feature.
    ///
    /// Each feature must carry a geometry, coordinates must be finite,
    /// line strings need at least two positions, polygon rings must be
    /// closed with at least four positions, and multi-geometries must be
    /// non-empty.
    pub fn validate(&self) -> DmisResult<()> {
        for (idx, feature) in self.features.iter().enumerate() {
            match &feature.geometry {
                Some(geometry) => validate_geometry(geometry)
                    .map_err(|e| DmisError::InvalidGeometry(format!("feature {}: {}", idx, e)))?,
                None => {
                    return Err(DmisError::InvalidGeometry(format!(
                        "feature {}: missing geometry",
                        idx
                    )))
                }
            }
        }
        Ok(())
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// A GeoJSON Feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    /// The geometry of this feature. `None` serializes as `null`, used by
    /// the "no data" placeholder feature.
    pub geometry: Option<Geometry>,

    /// Free-form feature properties.
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Create a new feature with the given geometry.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            type_: "Feature".to_string(),
            geometry: Some(geometry),
            properties: Map::new(),
        }
    }

    /// Create a feature with a `null` geometry.
    pub fn placeholder() -> Self {
        Self {
            type_: "Feature".to_string(),
            geometry: None,
            properties: Map::new(),
        }
    }

    /// Create a new feature with a point geometry.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(Geometry::point(x, y))
    }

    /// Set a property value.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Replace the whole property map.
    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }
}

/// GeoJSON geometry types the transcoders emit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A point geometry.
    Point {
        /// Coordinates as [x, y].
        coordinates: Position,
    },

    /// A multi-point geometry.
    MultiPoint {
        /// Array of [x, y] positions.
        coordinates: Vec<Position>,
    },

    /// A line string geometry.
    LineString {
        /// Array of [x, y] positions (two or more).
        coordinates: Vec<Position>,
    },

    /// A multi-line-string geometry.
    MultiLineString {
        /// Array of line strings.
        coordinates: Vec<Vec<Position>>,
    },

    /// A polygon geometry.
    Polygon {
        /// Array of linear rings (first is exterior, rest are holes).
        coordinates: Vec<Vec<Position>>,
    },

    /// A multi-polygon geometry.
    MultiPolygon {
        /// Array of polygons.
        coordinates: Vec<Vec<Vec<Position>>>,
    },
}

impl Geometry {
    /// Create a point geometry.
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point {
            coordinates: [x, y],
        }
    }

    /// Create a line string geometry.
    pub fn line_string(coordinates: Vec<Position>) -> Self {
        Geometry::LineString { coordinates }
    }

    /// Create a polygon geometry.
    pub fn polygon(coordinates: Vec<Vec<Position>>) -> Self {
        Geometry::Polygon { coordinates }
    }
}

/// A named coordinate reference system member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Crs {
    /// Type identifier (always "name").
    #[serde(rename = "type")]
    pub type_: String,

    /// CRS properties.
    pub properties: CrsProperties,
}

/// Properties of a named CRS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrsProperties {
    /// CRS name, e.g. "EPSG:3857".
    pub name: String,
}

impl Crs {
    /// Create a named CRS for the given well-known id.
    pub fn named(wkid: i32) -> Self {
        Self {
            type_: "name".to_string(),
            properties: CrsProperties {
                name: format!("EPSG:{}", wkid),
            },
        }
    }
}

fn validate_geometry(geometry: &Geometry) -> Result<(), String> {
    match geometry {
        Geometry::Point { coordinates } => validate_position(coordinates),
        Geometry::MultiPoint { coordinates } => {
            if coordinates.is_empty() {
                return Err("empty MultiPoint".to_string());
            }
            coordinates.iter().try_for_each(validate_position)
        }
        Geometry::LineString { coordinates } => validate_line(coordinates),
        Geometry::MultiLineString { coordinates } => {
            if coordinates.is_empty() {
                return Err("empty MultiLineString".to_string());
            }
            coordinates.iter().try_for_each(|line| validate_line(line))
        }
        Geometry::Polygon { coordinates } => validate_rings(coordinates),
        Geometry::MultiPolygon { coordinates } => {
            if coordinates.is_empty() {
                return Err("empty MultiPolygon".to_string());
            }
            coordinates.iter().try_for_each(|rings| validate_rings(rings))
        }
    }
}

fn validate_position(position: &Position) -> Result<(), String> {
    if position.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(format!("non-finite coordinate {:?}", position))
    }
}

fn validate_line(line: &[Position]) -> Result<(), String> {
    if line.len() < 2 {
        return Err(format!("line string with {} position(s)", line.len()));
    }
    line.iter().try_for_each(validate_position)
}

fn validate_rings(rings: &[Vec<Position>]) -> Result<(), String> {
    if rings.is_empty() {
        return Err("polygon without rings".to_string());
    }
    for ring in rings {
        if ring.len() < 4 {
            return Err(format!("ring with {} position(s)", ring.len()));
        }
        if ring.first() != ring.last() {
            return Err("unclosed ring".to_string());
        }
        ring.iter().try_for_each(validate_position)?;
    }
    Ok(())
}
