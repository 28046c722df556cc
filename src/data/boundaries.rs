use std::fs;
use std::path::Path;

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use glam::DVec2;
use tracing::debug;

use crate::data::topojson::{Topology, TopologyError};
use crate::error::DatasetLoadError;

/// Geometry type of a boundary feature, which decides its fill
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryKind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Point(_) => GeometryKind::Point,
            Value::MultiPoint(_) => GeometryKind::MultiPoint,
            Value::LineString(_) => GeometryKind::LineString,
            Value::MultiLineString(_) => GeometryKind::MultiLineString,
            Value::Polygon(_) => GeometryKind::Polygon,
            Value::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Value::GeometryCollection(_) => GeometryKind::GeometryCollection,
        }
    }

    /// Polygons and multi-polygons are filled as land; everything else is an overlay
    pub fn is_land(self) -> bool {
        matches!(self, GeometryKind::Polygon | GeometryKind::MultiPolygon)
    }
}

/// A ring or path of lon/lat coordinates
pub type LineString = Vec<DVec2>;

/// A named geographic shape
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryFeature {
    pub name: String,
    pub kind: GeometryKind,
    /// Each polygon is a list of rings, exterior first
    pub polygons: Vec<Vec<LineString>>,
    pub lines: Vec<LineString>,
    pub points: Vec<DVec2>,
}

impl BoundaryFeature {
    /// Build from a GeoJSON feature; features without geometry yield `None`
    pub fn from_feature(index: usize, feature: &Feature) -> Option<Self> {
        let geometry = feature.geometry.as_ref()?;

        let name = feature
            .property("name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| {
                feature.id.as_ref().map(|id| match id {
                    geojson::feature::Id::String(s) => s.clone(),
                    geojson::feature::Id::Number(n) => n.to_string(),
                })
            })
            .unwrap_or_else(|| format!("feature #{index}"));

        let mut shape = Self {
            name,
            kind: GeometryKind::of(&geometry.value),
            polygons: Vec::new(),
            lines: Vec::new(),
            points: Vec::new(),
        };
        shape.collect(&geometry.value);
        Some(shape)
    }

    fn collect(&mut self, value: &Value) {
        match value {
            Value::Point(p) => self.points.extend(position(p)),
            Value::MultiPoint(ps) => self.points.extend(ps.iter().filter_map(|p| position(p))),
            Value::LineString(coords) => self.lines.push(path(coords)),
            Value::MultiLineString(lines) => self.lines.extend(lines.iter().map(|l| path(l))),
            Value::Polygon(rings) => self.polygons.push(rings.iter().map(|r| path(r)).collect()),
            Value::MultiPolygon(polygons) => {
                for rings in polygons {
                    self.polygons.push(rings.iter().map(|r| path(r)).collect());
                }
            }
            Value::GeometryCollection(geometries) => {
                for g in geometries {
                    self.collect(&g.value);
                }
            }
        }
    }

    /// Every vertex of the feature
    pub fn vertices(&self) -> impl Iterator<Item = DVec2> + '_ {
        self.polygons
            .iter()
            .flatten()
            .chain(self.lines.iter())
            .flatten()
            .copied()
            .chain(self.points.iter().copied())
    }
}

fn position(p: &[f64]) -> Option<DVec2> {
    match p {
        [x, y, ..] => Some(DVec2::new(*x, *y)),
        _ => None,
    }
}

fn path(coords: &[Vec<f64>]) -> LineString {
    coords.iter().filter_map(|c| position(c)).collect()
}

/// Load boundary features from a TopoJSON topology (using `object`) or a GeoJSON document
pub fn load_boundaries(path: &Path, object: &str) -> Result<Vec<BoundaryFeature>, DatasetLoadError> {
    let mut bytes = fs::read(path).map_err(|source| DatasetLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_boundaries(&mut bytes, path, object)
}

/// Parse boundary JSON in place (the buffer is used as scratch space by the parser)
pub fn parse_boundaries(
    bytes: &mut [u8],
    path: &Path,
    object: &str,
) -> Result<Vec<BoundaryFeature>, DatasetLoadError> {
    let value: serde_json::Value =
        simd_json::serde::from_slice(bytes).map_err(|source| DatasetLoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let collection = if value.get("type").and_then(|t| t.as_str()) == Some("Topology") {
        let topology: Topology =
            serde_json::from_value(value).map_err(|e| DatasetLoadError::Topology {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        topology.features(object).map_err(|err| match err {
            TopologyError::MissingObject(name) => {
                debug!(
                    available = ?topology.object_names().collect::<Vec<_>>(),
                    "topology object not found"
                );
                DatasetLoadError::MissingObject {
                    path: path.to_path_buf(),
                    name,
                }
            }
            TopologyError::Invalid(reason) => DatasetLoadError::Topology {
                path: path.to_path_buf(),
                reason,
            },
        })?
    } else {
        let geojson = GeoJson::from_json_value(value).map_err(|e| DatasetLoadError::GeoJson {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        into_collection(geojson)
    };

    Ok(collection
        .features
        .iter()
        .enumerate()
        .filter_map(|(idx, feature)| BoundaryFeature::from_feature(idx, feature))
        .collect())
}

fn into_collection(geojson: GeoJson) -> FeatureCollection {
    let features = match geojson {
        GeoJson::FeatureCollection(fc) => return fc,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![feature_of(g)],
    };
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn feature_of(geometry: Geometry) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: None,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str, object: &str) -> Result<Vec<BoundaryFeature>, DatasetLoadError> {
        let mut bytes = json.as_bytes().to_vec();
        parse_boundaries(&mut bytes, Path::new("world.json"), object)
    }

    #[test]
    fn test_geojson_feature_collection() {
        let features = parse(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "properties": { "name": "Box" },
                        "geometry": {
                            "type": "Polygon",
                            "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]], [[2,2],[4,2],[4,4],[2,2]]]
                        }
                    },
                    {
                        "type": "Feature",
                        "properties": {},
                        "geometry": { "type": "LineString", "coordinates": [[0,0],[5,5]] }
                    },
                    { "type": "Feature", "properties": null, "geometry": null }
                ]
            }"#,
            "countries",
        )
        .unwrap();

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].name, "Box");
        assert_eq!(features[0].kind, GeometryKind::Polygon);
        assert!(features[0].kind.is_land());
        assert_eq!(features[0].polygons[0].len(), 2);
        assert_eq!(features[1].name, "feature #1");
        assert_eq!(features[1].kind, GeometryKind::LineString);
        assert!(!features[1].kind.is_land());
        assert_eq!(features[1].lines[0], vec![DVec2::ZERO, DVec2::new(5.0, 5.0)]);
    }

    #[test]
    fn test_bare_geometry() {
        let features = parse(r#"{ "type": "Point", "coordinates": [3, 4] }"#, "countries").unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].points, vec![DVec2::new(3.0, 4.0)]);
    }

    #[test]
    fn test_topology_object() {
        let features = parse(
            r#"{
                "type": "Topology",
                "arcs": [[[0,0],[1,0],[1,1],[0,0]]],
                "objects": {
                    "countries": {
                        "type": "GeometryCollection",
                        "geometries": [
                            { "type": "MultiPolygon", "id": 250, "arcs": [[[0]]] }
                        ]
                    }
                }
            }"#,
            "countries",
        )
        .unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].name, "250");
        assert_eq!(features[0].kind, GeometryKind::MultiPolygon);
        assert_eq!(features[0].vertices().count(), 4);
    }

    #[test]
    fn test_missing_topology_object() {
        let err = parse(r#"{ "type": "Topology", "arcs": [], "objects": {} }"#, "countries").unwrap_err();
        assert!(matches!(err, DatasetLoadError::MissingObject { name, .. } if name == "countries"));
    }

    #[test]
    fn test_invalid_json() {
        let err = parse("{ not json", "countries").unwrap_err();
        assert!(matches!(err, DatasetLoadError::Json { .. }));
    }

    #[test]
    fn test_invalid_geojson() {
        let err = parse(r#"{ "type": "Nonsense" }"#, "countries").unwrap_err();
        assert!(matches!(err, DatasetLoadError::GeoJson { .. }));
    }
}
