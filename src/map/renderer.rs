use std::collections::BTreeMap;
use std::time::Instant;

use glam::DVec2;
use rayon::prelude::*;
use tracing::debug;

use crate::braille::BrailleCanvas;
use crate::data::boundaries::LineString;
use crate::data::{BoundaryFeature, EarthquakeRecord, RecordId};
use crate::map::animation::HoverState;
use crate::map::geometry::{draw_circle, draw_line, polygon_spans, Span};
use crate::map::markers::{hover_radius, is_visible, Emphasis, Marker, MarkerColor};
use crate::map::projection::{Mercator, Viewport};
use crate::map::spatial::SpatialGrid;

/// Pointer slack for hit testing, in Braille pixels (about half a terminal cell)
const HIT_TOLERANCE_PX: f64 = 2.5;

/// Grid cell size for marker lookup, in canvas units
const GRID_CELL: f64 = 8.0;

/// A boundary feature projected onto the canvas once, at load time
struct ProjectedFeature {
    /// Filled as land (polygon/multi-polygon) or drawn as a light-blue overlay
    is_land: bool,
    polygons: Vec<Vec<LineString>>,
    lines: Vec<LineString>,
    points: Vec<DVec2>,
    bbox_min: DVec2,
    bbox_max: DVec2,
}

impl ProjectedFeature {
    /// `None` when the feature has no vertices to draw
    fn new(feature: &BoundaryFeature, projection: &Mercator) -> Option<Self> {
        let project = |path: &Vec<DVec2>| -> LineString {
            path.iter().map(|&p| projection.project(p)).collect()
        };
        let polygons: Vec<Vec<LineString>> = feature
            .polygons
            .iter()
            .map(|rings| rings.iter().map(project).collect())
            .collect();
        let lines: Vec<LineString> = feature.lines.iter().map(project).collect();
        let points: Vec<DVec2> = feature.points.iter().map(|&p| projection.project(p)).collect();

        let (bbox_min, bbox_max) = polygons
            .iter()
            .flatten()
            .chain(lines.iter())
            .flatten()
            .chain(points.iter())
            .fold(
                (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
                |(lo, hi), p| (lo.min(*p), hi.max(*p)),
            );
        if !bbox_min.is_finite() {
            debug!(feature = %feature.name, "skipping boundary feature without vertices");
            return None;
        }

        Some(Self {
            is_land: feature.kind.is_land(),
            polygons,
            lines,
            points,
            bbox_min,
            bbox_max,
        })
    }

    fn might_be_visible(&self, viewport: &Viewport) -> bool {
        let (x0, y0) = viewport.project(self.bbox_min);
        let (x1, y1) = viewport.project(self.bbox_max);
        viewport.line_might_be_visible((x0, y0), (x1, y1))
    }
}

/// A Braille layer holding every marker of one color and emphasis
pub struct MarkerLayer {
    pub color: MarkerColor,
    pub emphasis: Emphasis,
    pub canvas: BrailleCanvas,
}

/// Rendered map layers, back to front
pub struct MapLayers {
    /// Polygon fills and outlines
    pub land: BrailleCanvas,
    /// Non-polygon boundary geometry
    pub overlay: BrailleCanvas,
    /// Sorted so stronger emphasis is drawn last
    pub markers: Vec<MarkerLayer>,
}

/// Holds the projected boundary features and earthquake records and draws
/// them for a given view
pub struct MapRenderer {
    projection: Mercator,
    features: Vec<ProjectedFeature>,
    records: Vec<EarthquakeRecord>,
    /// Canvas position of each record, indexed by `RecordId`
    positions: Vec<DVec2>,
    grid: SpatialGrid<RecordId>,
}

impl MapRenderer {
    /// Fit the projection to the boundaries, then project boundaries and
    /// records onto the canvas
    pub fn new(boundaries: &[BoundaryFeature], records: Vec<EarthquakeRecord>) -> Self {
        let projection = Mercator::fit(boundaries.iter().flat_map(|f| f.vertices()));
        debug!(scale = projection.scale(), "projection fitted");

        let features: Vec<ProjectedFeature> = boundaries
            .par_iter()
            .filter_map(|f| ProjectedFeature::new(f, &projection))
            .collect();

        let positions: Vec<DVec2> = records
            .iter()
            .map(|r| projection.project(DVec2::new(r.longitude, r.latitude)))
            .collect();

        let mut grid = SpatialGrid::new(GRID_CELL);
        for (idx, &p) in positions.iter().enumerate() {
            grid.insert(p, RecordId(idx));
        }

        Self {
            projection,
            features,
            records,
            positions,
            grid,
        }
    }

    pub fn projection(&self) -> &Mercator {
        &self.projection
    }

    pub fn records(&self) -> &[EarthquakeRecord] {
        &self.records
    }

    pub fn record(&self, id: RecordId) -> Option<&EarthquakeRecord> {
        self.records.get(id.0)
    }

    pub fn position(&self, id: RecordId) -> Option<DVec2> {
        self.positions.get(id.0).copied()
    }

    /// False when neither dataset produced anything to draw
    pub fn has_data(&self) -> bool {
        !self.features.is_empty() || !self.records.is_empty()
    }

    /// The marker for one record at the given scale and hover amount
    pub fn marker(&self, id: RecordId, scale: f64, hover: f64) -> Option<Marker> {
        let record = self.record(id)?;
        let position = self.position(id)?;
        Some(Marker::derive(id, position, record.magnitude, scale, hover))
    }

    /// Every marker for the current view
    pub fn markers(&self, scale: f64, hover: &HoverState, now: Instant) -> Vec<Marker> {
        self.records
            .par_iter()
            .zip(self.positions.par_iter())
            .enumerate()
            .map(|(idx, (record, &position))| {
                let id = RecordId(idx);
                Marker::derive(id, position, record.magnitude, scale, hover.amount(id, now))
            })
            .collect()
    }

    /// Number of records shown at `scale`
    pub fn visible_count(&self, scale: f64) -> usize {
        self.records
            .iter()
            .filter(|r| is_visible(scale, r.magnitude))
            .count()
    }

    /// The visible marker under a pixel position. The closest one wins; on a
    /// tie the later record wins since it is drawn on top.
    pub fn marker_at(
        &self,
        viewport: &Viewport,
        pixel: DVec2,
        hover: &HoverState,
        now: Instant,
    ) -> Option<RecordId> {
        let scale = viewport.scale();
        let pixels_per_unit = viewport.world_to_pixels(1.0);
        let center = viewport.unproject(pixel.x, pixel.y);
        let reach = hover_radius(scale) + HIT_TOLERANCE_PX / pixels_per_unit.min_element();

        let mut best: Option<(f64, RecordId)> = None;
        for idx in self.grid.query_radius(center, reach) {
            let Some(&(_, id)) = self.grid.get(idx) else { continue };
            let Some(marker) = self.marker(id, scale, hover.amount(id, now)) else { continue };
            if marker.is_hidden() {
                continue;
            }

            let distance = (viewport.project_f(marker.position) - pixel).length();
            let radius_px = marker.radius * pixels_per_unit.x;
            if distance > radius_px + HIT_TOLERANCE_PX {
                continue;
            }
            match best {
                Some((d, best_id)) if d < distance || (d == distance && best_id > id) => {}
                _ => best = Some((distance, id)),
            }
        }

        best.map(|(_, id)| id)
    }

    /// Render all layers for a canvas of `width` x `height` characters
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        hover: &HoverState,
        now: Instant,
    ) -> MapLayers {
        let mut land = BrailleCanvas::new(width, height);
        let mut overlay = BrailleCanvas::new(width, height);
        let (pixel_width, pixel_height) = land.pixel_size();

        let visible: Vec<&ProjectedFeature> = self
            .features
            .iter()
            .filter(|f| f.might_be_visible(viewport))
            .collect();

        // Scanline work is independent per feature
        let fills: Vec<Vec<Span>> = visible
            .par_iter()
            .copied()
            .filter(|f| f.is_land)
            .flat_map_iter(|f| f.polygons.iter())
            .map(|rings| {
                let pixel_rings: Vec<Vec<DVec2>> = rings
                    .iter()
                    .map(|ring| ring.iter().map(|&p| viewport.project_f(p)).collect())
                    .collect();
                polygon_spans(&pixel_rings, pixel_width, pixel_height)
            })
            .collect();
        for span in fills.iter().flatten() {
            land.fill_span(span.y, span.x0, span.x1);
        }

        for feature in visible {
            if feature.is_land {
                // Outlines keep islands smaller than a pixel visible
                for rings in &feature.polygons {
                    if let Some(exterior) = rings.first() {
                        draw_linestring(&mut land, exterior, viewport);
                    }
                }
            } else {
                for rings in &feature.polygons {
                    for ring in rings {
                        draw_linestring(&mut overlay, ring, viewport);
                    }
                }
                for line in &feature.lines {
                    draw_linestring(&mut overlay, line, viewport);
                }
                for &p in &feature.points {
                    let (px, py) = viewport.project(p);
                    draw_circle(&mut overlay, px, py, 1);
                }
            }
        }

        let mut layers: BTreeMap<(Emphasis, MarkerColor), BrailleCanvas> = BTreeMap::new();
        let pixels_per_unit = viewport.world_to_pixels(1.0);
        for marker in self.markers(viewport.scale(), hover, now) {
            if marker.is_hidden() {
                continue;
            }
            let (px, py) = viewport.project(marker.position);
            if !viewport.is_visible(px, py) {
                continue;
            }
            let radius = (marker.radius * pixels_per_unit.x).round() as i32;
            let canvas = layers
                .entry((Emphasis::from_opacity(marker.opacity), marker.color))
                .or_insert_with(|| BrailleCanvas::new(width, height));
            draw_circle(canvas, px, py, radius);
        }

        MapLayers {
            land,
            overlay,
            markers: layers
                .into_iter()
                .map(|((emphasis, color), canvas)| MarkerLayer {
                    color,
                    emphasis,
                    canvas,
                })
                .collect(),
        }
    }
}

/// Draw a linestring with viewport culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &[DVec2], viewport: &Viewport) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;

    for &p in line {
        let (px, py) = viewport.project(p);

        if let Some((prev_x, prev_y)) = prev {
            if viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }

        prev = Some((px, py));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GeometryKind;
    use crate::map::projection::ZoomTransform;
    use std::time::Duration;

    fn record(lon: f64, lat: f64, magnitude: f64) -> EarthquakeRecord {
        EarthquakeRecord {
            longitude: lon,
            latitude: lat,
            magnitude,
            location: format!("M{magnitude} test"),
            date_time: "01-01-2020 00:00".into(),
            tsunami: "0".into(),
            mag_type: "mww".into(),
            depth: "10".into(),
            longitude_text: lon.to_string(),
            latitude_text: lat.to_string(),
        }
    }

    fn square(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> BoundaryFeature {
        BoundaryFeature {
            name: "square".into(),
            kind: GeometryKind::Polygon,
            polygons: vec![vec![vec![
                DVec2::new(lon0, lat0),
                DVec2::new(lon1, lat0),
                DVec2::new(lon1, lat1),
                DVec2::new(lon0, lat1),
                DVec2::new(lon0, lat0),
            ]]],
            lines: Vec::new(),
            points: Vec::new(),
        }
    }

    fn world_viewport() -> Viewport {
        // 200x50 characters of Braille
        Viewport::world(400, 200)
    }

    #[test]
    fn test_empty_renderer_uses_world_projection() {
        let renderer = MapRenderer::new(&[], Vec::new());
        assert_eq!(renderer.projection(), &Mercator::world());
        assert!(!renderer.has_data());
    }

    #[test]
    fn test_feature_without_vertices_is_dropped() {
        let mut hollow = square(0.0, 0.0, 10.0, 10.0);
        hollow.polygons.clear();
        let renderer = MapRenderer::new(&[square(-30.0, -30.0, 30.0, 30.0), hollow], Vec::new());
        assert_eq!(renderer.features.len(), 1);
        assert!(renderer.has_data());
    }

    #[test]
    fn test_land_is_filled() {
        let renderer = MapRenderer::new(&[square(-30.0, -30.0, 30.0, 30.0)], Vec::new());
        let layers = renderer.render(200, 50, &world_viewport(), &HoverState::default(), Instant::now());
        assert!(!layers.land.is_empty());
        assert!(layers.overlay.is_empty());
        assert!(layers.markers.is_empty());
    }

    #[test]
    fn test_non_polygon_goes_to_overlay() {
        let line = BoundaryFeature {
            name: "line".into(),
            kind: GeometryKind::LineString,
            polygons: Vec::new(),
            lines: vec![vec![DVec2::new(-50.0, 0.0), DVec2::new(50.0, 10.0)]],
            points: Vec::new(),
        };
        let renderer = MapRenderer::new(&[square(-60.0, -40.0, 60.0, 40.0), line], Vec::new());
        let layers = renderer.render(200, 50, &world_viewport(), &HoverState::default(), Instant::now());
        assert!(!layers.overlay.is_empty());
    }

    #[test]
    fn test_markers_follow_visibility_policy() {
        let records = vec![record(10.0, 10.0, 9.5), record(-40.0, 20.0, 6.5)];
        let renderer = MapRenderer::new(&[], records);
        let hover = HoverState::default();
        let now = Instant::now();

        let markers = renderer.markers(1.0, &hover, now);
        assert!(!markers[0].is_hidden());
        assert!(markers[1].is_hidden());
        assert_eq!(renderer.visible_count(1.0), 1);
        assert_eq!(renderer.visible_count(20.0), 2);

        let layers = renderer.render(200, 50, &world_viewport(), &hover, now);
        assert_eq!(layers.markers.len(), 1);
        assert_eq!(layers.markers[0].color, MarkerColor::Red);
        assert_eq!(layers.markers[0].emphasis, Emphasis::Normal);
    }

    #[test]
    fn test_hovered_marker_gets_its_own_layer() {
        let renderer = MapRenderer::new(&[], vec![record(0.0, 0.0, 8.5), record(20.0, 0.0, 8.6)]);
        let mut hover = HoverState::default();
        let t0 = Instant::now();
        hover.set_hovered(Some(RecordId(0)), t0);

        let layers = renderer.render(200, 50, &world_viewport(), &hover, t0 + Duration::from_millis(250));
        let kinds: Vec<_> = layers.markers.iter().map(|l| (l.emphasis, l.color)).collect();
        assert_eq!(
            kinds,
            vec![(Emphasis::Normal, MarkerColor::Orange), (Emphasis::Strong, MarkerColor::Orange)]
        );
    }

    #[test]
    fn test_marker_at_pointer() {
        let renderer = MapRenderer::new(&[], vec![record(0.0, 0.0, 9.0), record(60.0, 0.0, 6.0)]);
        let vp = world_viewport();
        let hover = HoverState::default();
        let now = Instant::now();

        let on_big = vp.project_f(renderer.position(RecordId(0)).unwrap());
        assert_eq!(renderer.marker_at(&vp, on_big, &hover, now), Some(RecordId(0)));

        // Hidden markers cannot be hit
        let on_small = vp.project_f(renderer.position(RecordId(1)).unwrap());
        assert_eq!(renderer.marker_at(&vp, on_small, &hover, now), None);

        // Zoomed in past 16 everything is visible
        let pos = renderer.position(RecordId(1)).unwrap();
        let zoomed_vp = Viewport::new(
            ZoomTransform {
                k: 20.0,
                translate: DVec2::new(1000.0, 500.0) - pos * 20.0,
            },
            400,
            200,
        );
        let on_small = zoomed_vp.project_f(pos);
        assert_eq!(renderer.marker_at(&zoomed_vp, on_small, &hover, now), Some(RecordId(1)));
    }

    #[test]
    fn test_overlapping_markers_prefer_later_record() {
        let renderer = MapRenderer::new(&[], vec![record(5.0, 5.0, 9.0), record(5.0, 5.0, 9.1)]);
        let vp = world_viewport();
        let p = vp.project_f(renderer.position(RecordId(0)).unwrap());
        assert_eq!(
            renderer.marker_at(&vp, p, &HoverState::default(), Instant::now()),
            Some(RecordId(1))
        );
    }
}
