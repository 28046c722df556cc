use glam::DVec2;
use std::f64::consts::PI;

/// Logical canvas the projection is fitted to
pub const CANVAS_WIDTH: f64 = 2000.0;
pub const CANVAS_HEIGHT: f64 = 1000.0;

/// Zoom scale extent
pub const MIN_SCALE: f64 = 1.0;
pub const MAX_SCALE: f64 = 50.0;

/// Mercator projection fitted to the logical canvas.
/// Maps (lon, lat) degrees to canvas units with y pointing down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mercator {
    scale: f64,
}

impl Mercator {
    /// Unscaled Mercator in radians, y up, clipped to the square world (±85.0511°)
    fn raw(lonlat: DVec2) -> DVec2 {
        let lambda = lonlat.x.to_radians();
        let phi = lonlat.y.to_radians();
        let y = (PI / 4.0 + phi / 2.0).tan().ln();
        DVec2::new(lambda, if y.is_nan() { -PI } else { y.clamp(-PI, PI) })
    }

    /// Fit the projected bounds of `points` to the canvas, then center the
    /// origin (0°, 0°) on the canvas. With no points the whole world is used.
    pub fn fit(points: impl Iterator<Item = DVec2>) -> Self {
        let (min, max) = points
            .map(Self::raw)
            .fold(None, |acc: Option<(DVec2, DVec2)>, p| match acc {
                Some((min, max)) => Some((min.min(p), max.max(p))),
                None => Some((p, p)),
            })
            .filter(|(min, max)| *max != *min)
            .unwrap_or((DVec2::splat(-PI), DVec2::splat(PI)));

        let size = max - min;
        let scale = (CANVAS_WIDTH / size.x).min(CANVAS_HEIGHT / size.y);
        Self { scale }
    }

    /// Whole-world projection
    pub fn world() -> Self {
        Self::fit(std::iter::empty())
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Project lon/lat degrees to canvas coordinates
    pub fn project(&self, lonlat: DVec2) -> DVec2 {
        let raw = Self::raw(lonlat);
        DVec2::new(
            CANVAS_WIDTH / 2.0 + raw.x * self.scale,
            CANVAS_HEIGHT / 2.0 - raw.y * self.scale,
        )
    }

    /// Canvas coordinates back to lon/lat degrees
    pub fn invert(&self, point: DVec2) -> DVec2 {
        let lambda = (point.x - CANVAS_WIDTH / 2.0) / self.scale;
        let y = (CANVAS_HEIGHT / 2.0 - point.y) / self.scale;
        let phi = 2.0 * y.exp().atan() - PI / 2.0;
        DVec2::new(lambda.to_degrees(), phi.to_degrees())
    }
}

/// Pan/zoom mapping from canvas (world) coordinates to screen coordinates:
/// `screen = world * k + translate`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomTransform {
    pub k: f64,
    pub translate: DVec2,
}

impl ZoomTransform {
    pub const IDENTITY: Self = Self {
        k: 1.0,
        translate: DVec2::ZERO,
    };

    pub fn apply(&self, world: DVec2) -> DVec2 {
        world * self.k + self.translate
    }

    pub fn invert(&self, screen: DVec2) -> DVec2 {
        (screen - self.translate) / self.k
    }

    /// Translate by a world-space delta (moves the screen by `delta * k`)
    pub fn translate(&self, delta: DVec2) -> Self {
        Self {
            k: self.k,
            translate: self.translate + delta * self.k,
        }
    }

    /// Set the scale, clamped to the scale extent, keeping `anchor` (screen) fixed
    pub fn scale_to(&self, k: f64, anchor: DVec2) -> Self {
        let k = clamp_scale(k);
        let world = self.invert(anchor);
        Self {
            k,
            translate: anchor - world * k,
        }
    }

    /// Multiply the scale by `factor` around `anchor` (screen)
    pub fn scale_by(&self, factor: f64, anchor: DVec2) -> Self {
        self.scale_to(self.k * factor, anchor)
    }

    /// Keep the visible extent inside the translate extent. Both extents are
    /// the canvas rectangle, so at k = 1 the translation is always zero.
    pub fn constrain(&self) -> Self {
        let extent_max = DVec2::new(CANVAS_WIDTH, CANVAS_HEIGHT);
        let d0 = self.invert(DVec2::ZERO);
        let d1 = self.invert(extent_max) - extent_max;
        self.translate(DVec2::new(constrain_axis(d0.x, d1.x), constrain_axis(d0.y, d1.y)))
    }
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn constrain_axis(d0: f64, d1: f64) -> f64 {
    if d1 > d0 {
        (d0 + d1) / 2.0
    } else {
        let low = d0.min(0.0);
        if low != 0.0 {
            low
        } else {
            d1.max(0.0)
        }
    }
}

/// Clamp a scale factor to the allowed extent
pub fn clamp_scale(k: f64) -> f64 {
    if k.is_nan() {
        return MIN_SCALE;
    }
    k.clamp(MIN_SCALE, MAX_SCALE)
}

/// World-space translation for a screen-space drag delta at scale `k`
pub fn drag_delta(screen_delta: DVec2, k: f64) -> DVec2 {
    screen_delta / k
}

/// Viewport mapping the zoomed canvas onto a Braille pixel grid
#[derive(Clone, Debug)]
pub struct Viewport {
    pub transform: ZoomTransform,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(transform: ZoomTransform, width: usize, height: usize) -> Self {
        Self {
            transform,
            width,
            height,
        }
    }

    /// Create a world view (identity transform)
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(ZoomTransform::IDENTITY, width, height)
    }

    /// Current zoom scale
    pub fn scale(&self) -> f64 {
        self.transform.k
    }

    /// Pixels per logical screen unit on each axis
    fn pixels_per_unit(&self) -> DVec2 {
        DVec2::new(
            self.width.max(1) as f64 / CANVAS_WIDTH,
            self.height.max(1) as f64 / CANVAS_HEIGHT,
        )
    }

    /// Convert a pixel position to logical screen coordinates
    pub fn pixel_to_screen(&self, px: f64, py: f64) -> DVec2 {
        DVec2::new(px, py) / self.pixels_per_unit()
    }

    /// Length of a world-space distance in pixels, per axis
    pub fn world_to_pixels(&self, length: f64) -> DVec2 {
        self.pixels_per_unit() * length * self.transform.k
    }

    /// Project a world (canvas) point to fractional pixel coordinates
    pub fn project_f(&self, world: DVec2) -> DVec2 {
        self.transform.apply(world) * self.pixels_per_unit()
    }

    /// Project a world (canvas) point to pixel coordinates
    pub fn project(&self, world: DVec2) -> (i32, i32) {
        let p = self.project_f(world).floor();
        (p.x as i32, p.y as i32)
    }

    /// Unproject pixel coordinates back to world (canvas) coordinates
    pub fn unproject(&self, px: f64, py: f64) -> DVec2 {
        self.transform.invert(self.pixel_to_screen(px, py))
    }

    /// Pan by a pixel delta. The screen delta is divided by the scale before
    /// it is applied, so the map follows the pointer at every zoom level.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let screen = self.pixel_to_screen(dx, dy);
        self.transform = self.transform.translate(drag_delta(screen, self.transform.k));
    }

    /// Clamp the transform back inside the translate extent
    pub fn constrain(&mut self) {
        self.transform = self.transform.constrain();
    }

    /// Zoom by factor towards a specific pixel location
    pub fn zoom_at(&mut self, px: f64, py: f64, factor: f64) {
        let anchor = self.pixel_to_screen(px, py);
        self.transform = self.transform.scale_by(factor, anchor).constrain();
    }

    /// Set an absolute scale around the viewport center
    pub fn set_scale(&mut self, k: f64) {
        let center = DVec2::new(CANVAS_WIDTH / 2.0, CANVAS_HEIGHT / 2.0);
        self.transform = self.transform.scale_to(k, center).constrain();
    }

    /// Zoom in by a factor around the viewport center
    pub fn zoom_in(&mut self) {
        self.zoom_at(self.width as f64 / 2.0, self.height as f64 / 2.0, 1.5);
    }

    /// Zoom out by a factor around the viewport center
    pub fn zoom_out(&mut self) {
        self.zoom_at(self.width as f64 / 2.0, self.height as f64 / 2.0, 1.0 / 1.5);
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}
