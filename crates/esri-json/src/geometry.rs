//! Esri geometry objects to GeoJSON geometries.
//!
//! Dispatch is on the members present: `x`/`y` is a point, `points` a
//! multi-point, `paths` a polyline, `rings` a polygon. Ring winding decides
//! polygon structure: clockwise rings are outer boundaries, counter-clockwise
//! rings are holes, and holes may appear anywhere in the ring stream.

use dmis_common::{DmisError, DmisResult, Geometry, Position};
use serde_json::Value;

/// Convert one Esri geometry object into a GeoJSON geometry.
pub fn geometry_to_geojson(geometry: &Value) -> DmisResult<Geometry> {
    let object = geometry
        .as_object()
        .ok_or_else(|| DmisError::UnsupportedGeometry("geometry is not a JSON object".to_string()))?;

    if object.contains_key("x") && object.contains_key("y") {
        let x = number(&object["x"], "x")?;
        let y = number(&object["y"], "y")?;
        return Ok(Geometry::Point {
            coordinates: [x, y],
        });
    }

    if let Some(points) = object.get("points") {
        let coordinates = parse_positions(points)?;
        return Ok(Geometry::MultiPoint { coordinates });
    }

    if let Some(paths) = object.get("paths") {
        return paths_to_geojson(paths);
    }

    if let Some(rings) = object.get("rings") {
        return rings_to_geojson(rings);
    }

    Err(DmisError::UnsupportedGeometry(format!(
        "unrecognized geometry members: {:?}",
        object.keys().collect::<Vec<_>>()
    )))
}

fn paths_to_geojson(paths: &Value) -> DmisResult<Geometry> {
    let paths = paths
        .as_array()
        .ok_or_else(|| DmisError::UnsupportedGeometry("paths is not an array".to_string()))?;

    let mut lines = Vec::with_capacity(paths.len());
    for path in paths {
        lines.push(parse_positions(path)?);
    }

    if lines.len() == 1 {
        let coordinates = lines.remove(0);
        Ok(Geometry::LineString { coordinates })
    } else {
        Ok(Geometry::MultiLineString { coordinates: lines })
    }
}

fn rings_to_geojson(rings: &Value) -> DmisResult<Geometry> {
    let rings = rings
        .as_array()
        .ok_or_else(|| DmisError::UnsupportedGeometry("rings is not an array".to_string()))?;

    let mut outers: Vec<PendingPolygon> = Vec::new();
    let mut holes: Vec<(Vec<Position>, Bbox)> = Vec::new();

    for ring in rings {
        let closed = close_ring(parse_positions(ring)?)?;
        let area = signed_area(&closed);
        if area == 0.0 {
            return Err(DmisError::UnsupportedGeometry("zero-area ring".to_string()));
        }
        let bbox = Bbox::of(&closed);
        if area < 0.0 {
            // Clockwise: starts a new polygon.
            outers.push(PendingPolygon {
                outer: closed,
                holes: Vec::new(),
                bbox,
            });
        } else {
            holes.push((closed, bbox));
        }
    }

    // A hole belongs to the most recently started polygon whose extent
    // contains it, wherever it appeared in the ring stream.
    for (hole, bbox) in holes {
        match outers
            .iter_mut()
            .rev()
            .find(|polygon| polygon.bbox.contains(&bbox))
        {
            Some(polygon) => polygon.holes.push(hole),
            None => {
                return Err(DmisError::UnsupportedGeometry(
                    "hole ring outside every outer ring".to_string(),
                ))
            }
        }
    }

    let mut polygons: Vec<Vec<Vec<Position>>> = Vec::with_capacity(outers.len());
    for pending in outers {
        let mut rings = Vec::with_capacity(1 + pending.holes.len());
        rings.push(pending.outer);
        rings.extend(pending.holes);
        polygons.push(rings);
    }

    match polygons.len() {
        0 => Err(DmisError::UnsupportedGeometry("no outer rings".to_string())),
        1 => {
            let coordinates = polygons.remove(0);
            Ok(Geometry::Polygon { coordinates })
        }
        _ => Ok(Geometry::MultiPolygon {
            coordinates: polygons,
        }),
    }
}

struct PendingPolygon {
    outer: Vec<Position>,
    holes: Vec<Vec<Position>>,
    bbox: Bbox,
}

#[derive(Debug, Clone, Copy)]
struct Bbox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bbox {
    fn of(ring: &[Position]) -> Self {
        let mut bbox = Bbox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for &[x, y] in ring {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        bbox
    }

    fn contains(&self, other: &Bbox) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }
}

/// Append the first vertex when the ring does not repeat it.
fn close_ring(mut ring: Vec<Position>) -> DmisResult<Vec<Position>> {
    if ring.is_empty() {
        return Err(DmisError::UnsupportedGeometry("empty ring".to_string()));
    }
    if ring.first() != ring.last() {
        let first = ring[0];
        ring.push(first);
    }
    if ring.len() < 4 {
        return Err(DmisError::UnsupportedGeometry(format!(
            "ring with only {} position(s)",
            ring.len()
        )));
    }
    Ok(ring)
}

/// Shoelace signed area over a closed ring. Negative is clockwise.
fn signed_area(ring: &[Position]) -> f64 {
    let mut sum = 0.0;
    for window in ring.windows(2) {
        let [x1, y1] = window[0];
        let [x2, y2] = window[1];
        sum += x1 * y2 - x2 * y1;
    }
    sum / 2.0
}

/// Parse a list of positions.
///
/// Accepts nested pair arrays (`[[x, y], ...]`) and flat numeric lists
/// (`[x1, y1, x2, y2, ...]`); flat lists must pair up evenly.
fn parse_positions(value: &Value) -> DmisResult<Vec<Position>> {
    let items = value
        .as_array()
        .ok_or_else(|| DmisError::UnsupportedGeometry("positions are not an array".to_string()))?;

    if !items.is_empty() && items.iter().all(Value::is_number) {
        if items.len() % 2 != 0 {
            return Err(DmisError::UnsupportedGeometry(format!(
                "flat coordinate list of odd length {}",
                items.len()
            )));
        }
        return items
            .chunks(2)
            .map(|pair| Ok([number(&pair[0], "x")?, number(&pair[1], "y")?]))
            .collect();
    }

    items.iter().map(parse_position).collect()
}

fn parse_position(value: &Value) -> DmisResult<Position> {
    let parts = value.as_array().ok_or_else(|| {
        DmisError::UnsupportedGeometry(format!("position is not an array: {}", value))
    })?;
    if parts.len() < 2 {
        return Err(DmisError::UnsupportedGeometry(format!(
            "position with {} member(s)",
            parts.len()
        )));
    }
    // Members past x and y (z, m) are dropped.
    Ok([number(&parts[0], "x")?, number(&parts[1], "y")?])
}

fn number(value: &Value, member: &str) -> DmisResult<f64> {
    value.as_f64().ok_or_else(|| {
        DmisError::UnsupportedGeometry(format!("non-numeric {} member: {}", member, value))
    })
}
