use glam::DVec2;

use crate::braille::BrailleCanvas;

/// A horizontal run of pixels: row, first column, last column (inclusive)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub y: usize,
    pub x0: usize,
    pub x1: usize,
}

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a filled circle (radius 0 sets a single pixel)
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

/// Scanline-fill a polygon (pixel-space rings) with the even-odd rule.
/// A pixel is covered when its center lies inside. Spans are clipped to
/// `width` x `height`.
pub fn polygon_spans(rings: &[Vec<DVec2>], width: usize, height: usize) -> Vec<Span> {
    let mut spans = Vec::new();
    if width == 0 || height == 0 {
        return spans;
    }

    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    if !min_y.is_finite() || !max_y.is_finite() {
        return spans;
    }

    let first_row = (min_y - 0.5).ceil().max(0.0) as usize;
    let last_row = (max_y - 0.5).floor();
    if last_row < 0.0 {
        return spans;
    }
    let last_row = (last_row as usize).min(height - 1);

    let mut crossings: Vec<f64> = Vec::new();
    for y in first_row..=last_row {
        let scan = y as f64 + 0.5;
        crossings.clear();

        for ring in rings {
            let Some(&last) = ring.last() else { continue };
            let mut prev = last;
            for &p in ring {
                if (prev.y <= scan) != (p.y <= scan) {
                    crossings.push(prev.x + (scan - prev.y) * (p.x - prev.x) / (p.y - prev.y));
                }
                prev = p;
            }
        }

        crossings.sort_by(f64::total_cmp);
        for pair in crossings.chunks_exact(2) {
            let start = (pair[0] - 0.5).ceil().max(0.0);
            let end = (pair[1] - 0.5).floor().min((width - 1) as f64);
            if start <= end {
                spans.push(Span {
                    y,
                    x0: start as usize,
                    x1: end as usize,
                });
            }
        }
    }

    spans
}
