//! TopoJSON decoding into GeoJSON features.
//!
//! A topology stores shared boundaries once as arcs; geometries reference arcs
//! by index (`~i` meaning arc `i` reversed). Quantized topologies store arc
//! positions as integer deltas that are rebuilt with the `transform` block.

use std::collections::BTreeMap;

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, PointType, Value};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("no object named `{0}`")]
    MissingObject(String),
    #[error("{0}")]
    Invalid(String),
}

/// Top-level `"type": "Topology"` document
#[derive(Debug, Deserialize)]
pub struct Topology {
    #[serde(default)]
    transform: Option<Quantization>,
    #[serde(default)]
    arcs: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    objects: BTreeMap<String, TopoGeometry>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Quantization {
    scale: [f64; 2],
    translate: [f64; 2],
}

impl Quantization {
    fn apply(&self, x: f64, y: f64) -> PointType {
        vec![
            x * self.scale[0] + self.translate[0],
            y * self.scale[1] + self.translate[1],
        ]
    }
}

#[derive(Debug, Deserialize)]
struct TopoGeometry {
    /// `null` for empty geometries
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    arcs: Option<ArcRefs>,
    #[serde(default)]
    coordinates: Option<Positions>,
    #[serde(default)]
    geometries: Vec<TopoGeometry>,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    properties: Option<JsonObject>,
}

/// Arc index lists nested to the depth the geometry type needs
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArcRefs {
    Line(Vec<i64>),
    Rings(Vec<Vec<i64>>),
    Polygons(Vec<Vec<Vec<i64>>>),
}

impl ArcRefs {
    fn line(&self) -> Result<&[i64], TopologyError> {
        match self {
            ArcRefs::Line(refs) => Ok(refs),
            ArcRefs::Rings(r) if r.is_empty() => Ok(&[]),
            ArcRefs::Polygons(p) if p.is_empty() => Ok(&[]),
            _ => Err(shape_error("an arc list")),
        }
    }

    fn rings(&self) -> Result<&[Vec<i64>], TopologyError> {
        match self {
            ArcRefs::Rings(rings) => Ok(rings),
            ArcRefs::Line(l) if l.is_empty() => Ok(&[]),
            ArcRefs::Polygons(p) if p.is_empty() => Ok(&[]),
            _ => Err(shape_error("a list of arc lists")),
        }
    }

    fn polygons(&self) -> Result<&[Vec<Vec<i64>>], TopologyError> {
        match self {
            ArcRefs::Polygons(polygons) => Ok(polygons),
            ArcRefs::Line(l) if l.is_empty() => Ok(&[]),
            ArcRefs::Rings(r) if r.is_empty() => Ok(&[]),
            // A MultiPolygon whose polygons are all empty deserializes as rings
            ArcRefs::Rings(r) if r.iter().all(Vec::is_empty) => Ok(&[]),
            _ => Err(shape_error("a list of polygons")),
        }
    }
}

fn shape_error(expected: &str) -> TopologyError {
    TopologyError::Invalid(format!("geometry arcs are not {expected}"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Positions {
    One(Vec<f64>),
    Many(Vec<Vec<f64>>),
}

impl Topology {
    /// Convert the named object into features: a `GeometryCollection` yields
    /// one feature per member, any other geometry yields a single feature.
    pub fn features(&self, object: &str) -> Result<FeatureCollection, TopologyError> {
        let root = self
            .objects
            .get(object)
            .ok_or_else(|| TopologyError::MissingObject(object.to_string()))?;

        let decoder = Decoder::new(self)?;
        let features = if root.kind.as_deref() == Some("GeometryCollection") {
            root.geometries
                .iter()
                .map(|g| decoder.feature(g))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            vec![decoder.feature(root)?]
        };

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }

    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }
}

struct Decoder {
    transform: Option<Quantization>,
    /// Arcs with absolute, de-quantized positions
    arcs: Vec<Vec<PointType>>,
}

impl Decoder {
    fn new(topology: &Topology) -> Result<Self, TopologyError> {
        let transform = topology.transform;
        let arcs = topology
            .arcs
            .iter()
            .enumerate()
            .map(|(idx, arc)| decode_arc(idx, arc, transform))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { transform, arcs })
    }

    fn feature(&self, g: &TopoGeometry) -> Result<Feature, TopologyError> {
        Ok(Feature {
            bbox: None,
            geometry: self.geometry(g)?.map(Geometry::new),
            id: g.id.clone().and_then(feature_id),
            properties: g.properties.clone(),
            foreign_members: None,
        })
    }

    fn geometry(&self, g: &TopoGeometry) -> Result<Option<Value>, TopologyError> {
        let Some(kind) = g.kind.as_deref() else {
            return Ok(None);
        };

        let value = match kind {
            "Point" => match &g.coordinates {
                Some(Positions::One(p)) => Value::Point(self.point(p)?),
                _ => return Err(TopologyError::Invalid("Point without coordinates".into())),
            },
            "MultiPoint" => match &g.coordinates {
                Some(Positions::Many(ps)) => {
                    Value::MultiPoint(ps.iter().map(|p| self.point(p)).collect::<Result<_, _>>()?)
                }
                Some(Positions::One(p)) if p.is_empty() => Value::MultiPoint(Vec::new()),
                _ => return Err(TopologyError::Invalid("MultiPoint without coordinates".into())),
            },
            "LineString" => Value::LineString(self.line(self.refs(g)?.line()?)?),
            "MultiLineString" => Value::MultiLineString(
                self.refs(g)?
                    .rings()?
                    .iter()
                    .map(|refs| self.line(refs))
                    .collect::<Result<_, _>>()?,
            ),
            "Polygon" => Value::Polygon(self.polygon(self.refs(g)?.rings()?)?),
            "MultiPolygon" => Value::MultiPolygon(
                self.refs(g)?
                    .polygons()?
                    .iter()
                    .map(|rings| self.polygon(rings))
                    .collect::<Result<_, _>>()?,
            ),
            "GeometryCollection" => {
                let mut members = Vec::with_capacity(g.geometries.len());
                for member in &g.geometries {
                    if let Some(value) = self.geometry(member)? {
                        members.push(Geometry::new(value));
                    }
                }
                Value::GeometryCollection(members)
            }
            other => {
                return Err(TopologyError::Invalid(format!("unknown geometry type `{other}`")));
            }
        };

        Ok(Some(value))
    }

    fn refs<'g>(&self, g: &'g TopoGeometry) -> Result<&'g ArcRefs, TopologyError> {
        g.arcs.as_ref().ok_or_else(|| {
            TopologyError::Invalid(format!(
                "{} without arcs",
                g.kind.as_deref().unwrap_or("geometry")
            ))
        })
    }

    fn point(&self, p: &[f64]) -> Result<PointType, TopologyError> {
        let [x, y, ..] = p else {
            return Err(TopologyError::Invalid("position with fewer than 2 values".into()));
        };
        Ok(match self.transform {
            Some(t) => t.apply(*x, *y),
            None => vec![*x, *y],
        })
    }

    /// Join arcs end to end, dropping each arc's first point after the first arc
    fn stitch(&self, refs: &[i64]) -> Result<Vec<PointType>, TopologyError> {
        let mut points: Vec<PointType> = Vec::new();
        for &r in refs {
            let (idx, reversed) = if r < 0 { ((!r) as usize, true) } else { (r as usize, false) };
            let arc = self
                .arcs
                .get(idx)
                .ok_or_else(|| TopologyError::Invalid(format!("arc index {r} out of range")))?;

            points.pop();
            if reversed {
                points.extend(arc.iter().rev().cloned());
            } else {
                points.extend(arc.iter().cloned());
            }
        }
        Ok(points)
    }

    fn line(&self, refs: &[i64]) -> Result<Vec<PointType>, TopologyError> {
        let mut points = self.stitch(refs)?;
        if points.len() == 1 {
            points.push(points[0].clone());
        }
        Ok(points)
    }

    fn ring(&self, refs: &[i64]) -> Result<Vec<PointType>, TopologyError> {
        let mut points = self.stitch(refs)?;
        if let Some(first) = points.first().cloned() {
            while points.len() < 4 {
                points.push(first.clone());
            }
        }
        Ok(points)
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Vec<Vec<PointType>>, TopologyError> {
        rings.iter().map(|refs| self.ring(refs)).collect()
    }
}

fn decode_arc(
    idx: usize,
    arc: &[Vec<f64>],
    transform: Option<Quantization>,
) -> Result<Vec<PointType>, TopologyError> {
    let mut x = 0.0;
    let mut y = 0.0;
    arc.iter()
        .map(|position| {
            let [px, py, ..] = position.as_slice() else {
                return Err(TopologyError::Invalid(format!(
                    "arc {idx} has a position with fewer than 2 values"
                )));
            };
            Ok(match transform {
                Some(t) => {
                    x += px;
                    y += py;
                    t.apply(x, y)
                }
                None => vec![*px, *py],
            })
        })
        .collect()
}

fn feature_id(value: serde_json::Value) -> Option<Id> {
    match value {
        serde_json::Value::String(s) => Some(Id::String(s)),
        serde_json::Value::Number(n) => Some(Id::Number(n)),
        _ => None,
    }
}
