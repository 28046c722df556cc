//! Marker styling policy.
//!
//! Everything here is a pure function of the zoom scale, the magnitude and
//! (for hover) an interpolation amount. Radii are in canvas units, so a
//! `10 / scale` radius keeps the same on-screen size at every zoom level.

use glam::DVec2;

use crate::data::RecordId;

pub const BASE_RADIUS: f64 = 10.0;
pub const HOVER_RADIUS: f64 = 12.0;

/// Scale at or below which markers are drawn more opaque
const OPACITY_SCALE_BREAK: f64 = 6.0;

/// Fill color by magnitude band
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerColor {
    Green,
    Yellow,
    Orange,
    Red,
    /// Values outside every band (NaN magnitudes)
    Fallback,
}

impl MarkerColor {
    pub fn for_magnitude(magnitude: f64) -> Self {
        if magnitude < 7.0 {
            MarkerColor::Green
        } else if (7.0..8.0).contains(&magnitude) {
            MarkerColor::Yellow
        } else if (8.0..9.0).contains(&magnitude) {
            MarkerColor::Orange
        } else if magnitude >= 9.0 {
            MarkerColor::Red
        } else {
            MarkerColor::Fallback
        }
    }

    /// CSS color value
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            MarkerColor::Green => (0x00, 0x80, 0x00),
            MarkerColor::Yellow => (0xff, 0xff, 0x00),
            MarkerColor::Orange => (0xff, 0xa5, 0x00),
            MarkerColor::Red => (0xff, 0x00, 0x00),
            MarkerColor::Fallback => (0x90, 0xee, 0x90),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MarkerColor::Green => "<7",
            MarkerColor::Yellow => "7-8",
            MarkerColor::Orange => "8-9",
            MarkerColor::Red => "9+",
            MarkerColor::Fallback => "n/a",
        }
    }

    pub const ALL: [MarkerColor; 5] = [
        MarkerColor::Green,
        MarkerColor::Yellow,
        MarkerColor::Orange,
        MarkerColor::Red,
        MarkerColor::Fallback,
    ];
}

/// Smallest magnitude shown at `scale`, or `None` when every marker is shown
pub fn min_visible_magnitude(scale: f64) -> Option<f64> {
    if scale <= 4.0 {
        Some(8.0)
    } else if scale <= 16.0 {
        // (4, 5] and (5, 16] share the same threshold
        Some(7.0)
    } else {
        None
    }
}

/// Whether a marker of `magnitude` is shown at `scale`
pub fn is_visible(scale: f64, magnitude: f64) -> bool {
    match min_visible_magnitude(scale) {
        Some(min) => magnitude >= min,
        None => true,
    }
}

/// Radius at rest: `10 / scale` when visible, 0 when hidden
pub fn base_radius(scale: f64, magnitude: f64) -> f64 {
    if is_visible(scale, magnitude) {
        BASE_RADIUS / scale
    } else {
        0.0
    }
}

pub fn base_opacity(scale: f64) -> f64 {
    if scale <= OPACITY_SCALE_BREAK {
        0.5
    } else {
        0.3
    }
}

pub fn hover_radius(scale: f64) -> f64 {
    HOVER_RADIUS / scale
}

pub fn hover_opacity(scale: f64) -> f64 {
    if scale <= OPACITY_SCALE_BREAK {
        1.0
    } else {
        0.7
    }
}

/// Coarse opacity classes a terminal can show
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Emphasis {
    Faint,
    Normal,
    Strong,
}

impl Emphasis {
    pub fn from_opacity(opacity: f64) -> Self {
        if opacity >= 0.7 {
            Emphasis::Strong
        } else if opacity >= 0.5 {
            Emphasis::Normal
        } else {
            Emphasis::Faint
        }
    }
}

/// A marker as drawn for the current view
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Marker {
    pub id: RecordId,
    /// Canvas position
    pub position: DVec2,
    /// Canvas-unit radius; 0 means hidden
    pub radius: f64,
    pub color: MarkerColor,
    pub opacity: f64,
}

impl Marker {
    /// Derive a marker. `hover` in [0, 1] blends from the base style to the
    /// hover style; hidden markers stay hidden regardless of hover.
    pub fn derive(id: RecordId, position: DVec2, magnitude: f64, scale: f64, hover: f64) -> Self {
        let hover = hover.clamp(0.0, 1.0);
        let radius = if is_visible(scale, magnitude) {
            lerp(base_radius(scale, magnitude), hover_radius(scale), hover)
        } else {
            0.0
        };
        Self {
            id,
            position,
            radius,
            color: MarkerColor::for_magnitude(magnitude),
            opacity: lerp(base_opacity(scale), hover_opacity(scale), hover),
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.radius <= 0.0
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANDS: [f64; 9] = [1.0, 3.9, 4.0, 4.5, 5.0, 10.0, 16.0, 16.01, 50.0];

    #[test]
    fn test_color_bands() {
        assert_eq!(MarkerColor::for_magnitude(-1.0), MarkerColor::Green);
        assert_eq!(MarkerColor::for_magnitude(6.99), MarkerColor::Green);
        assert_eq!(MarkerColor::for_magnitude(7.0), MarkerColor::Yellow);
        assert_eq!(MarkerColor::for_magnitude(7.99), MarkerColor::Yellow);
        assert_eq!(MarkerColor::for_magnitude(8.0), MarkerColor::Orange);
        assert_eq!(MarkerColor::for_magnitude(8.99), MarkerColor::Orange);
        assert_eq!(MarkerColor::for_magnitude(9.0), MarkerColor::Red);
        assert_eq!(MarkerColor::for_magnitude(f64::INFINITY), MarkerColor::Red);
        assert_eq!(MarkerColor::for_magnitude(f64::NAN), MarkerColor::Fallback);
    }

    #[test]
    fn test_visibility_band_boundaries() {
        // Upper bounds are inclusive: 4, 5 and 16 belong to the lower band
        assert!(!is_visible(4.0, 7.9));
        assert!(is_visible(4.0, 8.0));
        assert!(!is_visible(1.0, 7.5));
        assert!(is_visible(4.0001, 7.0));
        assert!(!is_visible(4.0001, 6.9));
        assert!(is_visible(5.0, 7.0));
        assert!(!is_visible(5.0, 6.99));
        assert!(is_visible(16.0, 7.0));
        assert!(!is_visible(16.0, 6.99));
        assert!(is_visible(16.0001, 0.0));
        assert!(is_visible(50.0, -3.0));
    }

    #[test]
    fn test_nan_magnitude_only_visible_when_everything_is() {
        assert!(!is_visible(1.0, f64::NAN));
        assert!(!is_visible(16.0, f64::NAN));
        assert!(is_visible(17.0, f64::NAN));
    }

    #[test]
    fn test_great_quake_visible_everywhere() {
        for scale in BANDS {
            assert!(is_visible(scale, 9.5));
            let m = Marker::derive(RecordId(0), DVec2::ZERO, 9.5, scale, 0.0);
            assert_eq!(m.color, MarkerColor::Red);
            assert_eq!(m.radius, 10.0 / scale);
        }
    }

    #[test]
    fn test_moderate_quake_only_visible_when_zoomed_in() {
        for scale in BANDS {
            let m = Marker::derive(RecordId(0), DVec2::ZERO, 6.5, scale, 0.0);
            assert_eq!(m.color, MarkerColor::Green);
            assert_eq!(!m.is_hidden(), scale > 16.0, "scale {scale}");
        }
    }

    #[test]
    fn test_radius_non_increasing_with_scale() {
        for magnitude in [6.5, 7.5, 8.5] {
            let mut prev_visible: Option<f64> = None;
            let mut scale = 1.0;
            while scale <= 50.0 {
                let r = base_radius(scale, magnitude);
                if is_visible(scale, magnitude) {
                    assert_eq!(r, 10.0 / scale);
                    if let Some(prev) = prev_visible {
                        assert!(r <= prev);
                    }
                    prev_visible = Some(r);
                } else {
                    assert_eq!(r, 0.0);
                }
                scale += 0.25;
            }
        }
    }

    #[test]
    fn test_opacity() {
        assert_eq!(base_opacity(6.0), 0.5);
        assert_eq!(base_opacity(6.5), 0.3);
        assert_eq!(hover_opacity(6.0), 1.0);
        assert_eq!(hover_opacity(6.5), 0.7);
        assert_eq!(Emphasis::from_opacity(0.3), Emphasis::Faint);
        assert_eq!(Emphasis::from_opacity(0.5), Emphasis::Normal);
        assert_eq!(Emphasis::from_opacity(0.7), Emphasis::Strong);
    }

    #[test]
    fn test_hover_blend() {
        let rest = Marker::derive(RecordId(1), DVec2::ZERO, 8.2, 2.0, 0.0);
        let full = Marker::derive(RecordId(1), DVec2::ZERO, 8.2, 2.0, 1.0);
        assert_eq!(rest.radius, 5.0);
        assert_eq!(rest.opacity, 0.5);
        assert_eq!(full.radius, 6.0);
        assert_eq!(full.opacity, 1.0);

        // Hover never reveals a hidden marker
        let hidden = Marker::derive(RecordId(2), DVec2::ZERO, 6.0, 2.0, 1.0);
        assert!(hidden.is_hidden());
    }
}
