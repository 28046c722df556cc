use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use glam::DVec2;
use ratatui::layout::{Position, Rect};
use tracing::debug;

use crate::data::{Datasets, EarthquakeRecord, RecordId};
use crate::map::markers::min_visible_magnitude;
use crate::map::{HoverState, MapRenderer, Viewport, ZoomTransform};
use crate::ui;

/// Zoom factor per wheel notch or key press
const ZOOM_STEP: f64 = 1.5;

/// Keyboard pan step in Braille pixels
const PAN_STEP: f64 = 10.0;

/// Detail popup. Only one record can be shown at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Popup {
    #[default]
    Hidden,
    Shown(RecordId),
}

impl Popup {
    pub fn shown(&self) -> Option<RecordId> {
        match self {
            Popup::Hidden => None,
            Popup::Shown(id) => Some(*id),
        }
    }

    pub fn open(&mut self, id: RecordId) {
        *self = Popup::Shown(id);
    }

    pub fn close(&mut self) {
        *self = Popup::Hidden;
    }
}

/// Labeled popup lines for a record
pub fn popup_fields(record: &EarthquakeRecord) -> [(&'static str, String); 8] {
    let magnitude = if record.magnitude.is_nan() {
        "unknown".to_string()
    } else {
        record.magnitude.to_string()
    };
    [
        ("Magnitude", magnitude),
        ("Location", record.location.clone()),
        ("Time", record.date_time.clone()),
        ("Tsunami", record.tsunami.clone()),
        ("Magnitude Type", record.mag_type.clone()),
        ("Depth", record.depth.clone()),
        ("Latitude", record.latitude_text.clone()),
        ("Longitude", record.longitude_text.clone()),
    ]
}

/// The mutable view: zoom transform (inside the viewport) and popup
#[derive(Clone, Debug)]
pub struct ViewState {
    pub viewport: Viewport,
    pub popup: Popup,
}

/// Pointer gesture in progress, in terminal cells
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Gesture {
    #[default]
    Idle,
    /// Button down, not moved yet
    Pressed { at: (u16, u16) },
    Dragging { last: (u16, u16) },
}

/// Application state
pub struct App {
    pub view: ViewState,
    pub renderer: MapRenderer,
    pub hover: HoverState,
    pub should_quit: bool,
    /// Current mouse position for the pointer readout
    pub mouse_pos: Option<(u16, u16)>,
    /// Dataset load failures shown in the status bar
    pub warnings: Vec<String>,
    /// Rows dropped while loading earthquake records
    pub skipped_records: usize,
    gesture: Gesture,
    /// Wheel zoom is ignored while a drag is in progress
    zoom_enabled: bool,
    /// Whole terminal area
    area: Rect,
}

impl App {
    pub fn new(renderer: MapRenderer, area: Rect) -> Self {
        let inner = ui::map_inner(area);
        Self {
            view: ViewState {
                viewport: Viewport::world(inner.width as usize * 2, inner.height as usize * 4),
                popup: Popup::Hidden,
            },
            renderer,
            hover: HoverState::default(),
            should_quit: false,
            mouse_pos: None,
            warnings: Vec::new(),
            skipped_records: 0,
            gesture: Gesture::Idle,
            zoom_enabled: true,
            area,
        }
    }

    /// Build the app from whatever loaded. A missing boundary set leaves a
    /// world-extent projection; missing records leave boundaries only.
    pub fn from_datasets(datasets: Datasets, area: Rect) -> Self {
        let mut warnings = Vec::new();

        let boundaries = datasets.boundaries.unwrap_or_else(|e| {
            warnings.push(format!("boundaries unavailable: {e}"));
            Vec::new()
        });
        let (records, skipped) = match datasets.quakes {
            Ok(set) => (set.records, set.skipped),
            Err(e) => {
                warnings.push(format!("earthquakes unavailable: {e}"));
                (Vec::new(), 0)
            }
        };

        let mut app = Self::new(MapRenderer::new(&boundaries, records), area);
        app.warnings = warnings;
        app.skipped_records = skipped;
        app
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, area: Rect) {
        self.area = area;
        let inner = ui::map_inner(area);
        self.view.viewport.width = inner.width as usize * 2;
        self.view.viewport.height = inner.height as usize * 4;
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Advance animations
    pub fn tick(&mut self, now: Instant) {
        self.hover.tick(now);
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        // Only handle key press events (not release)
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Esc => {
                if self.view.popup.shown().is_some() {
                    self.close_popup();
                } else {
                    self.quit();
                }
            }

            // Arrows move the view, so the map content moves the other way
            KeyCode::Left | KeyCode::Char('h') => self.pan(PAN_STEP, 0.0),
            KeyCode::Right | KeyCode::Char('l') => self.pan(-PAN_STEP, 0.0),
            KeyCode::Up | KeyCode::Char('k') => self.pan(0.0, PAN_STEP),
            KeyCode::Down | KeyCode::Char('j') => self.pan(0.0, -PAN_STEP),

            KeyCode::Char('+') | KeyCode::Char('=') => self.view.viewport.zoom_in(),
            KeyCode::Char('-') | KeyCode::Char('_') => self.view.viewport.zoom_out(),

            KeyCode::Char('r') | KeyCode::Char('0') => self.reset(),

            KeyCode::Enter => {
                if let Some(id) = self.hover.hovered() {
                    self.open_popup(id);
                }
            }

            _ => return,
        }

        self.update_hover(now);
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        let (col, row) = (mouse.column, mouse.row);
        self.mouse_pos = Some((col, row));

        match mouse.kind {
            MouseEventKind::Moved => self.update_hover(now),
            MouseEventKind::ScrollUp => self.wheel_zoom(col, row, ZOOM_STEP, now),
            MouseEventKind::ScrollDown => self.wheel_zoom(col, row, 1.0 / ZOOM_STEP, now),
            MouseEventKind::Down(MouseButton::Left) => self.press(col, row),
            MouseEventKind::Drag(MouseButton::Left) => self.drag(col, row),
            MouseEventKind::Up(MouseButton::Left) => self.release(col, row, now),
            _ => {}
        }
    }

    /// Pan by a Braille pixel delta and constrain
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.view.viewport.pan(dx, dy);
        self.view.viewport.constrain();
        debug!(transform = ?self.view.viewport.transform, "pan");
    }

    /// Zoom to an absolute scale around the viewport center
    pub fn set_scale(&mut self, k: f64) {
        self.view.viewport.set_scale(k);
        debug!(k = self.view.viewport.scale(), "zoom");
    }

    pub fn reset(&mut self) {
        self.view.viewport.transform = ZoomTransform::IDENTITY;
        debug!("view reset");
    }

    pub fn open_popup(&mut self, id: RecordId) {
        debug!(record = id.0, "popup opened");
        self.view.popup.open(id);
    }

    pub fn close_popup(&mut self) {
        debug!("popup closed");
        self.view.popup.close();
    }

    /// Record shown in the popup
    pub fn popup_record(&self) -> Option<&EarthquakeRecord> {
        self.view.popup.shown().and_then(|id| self.renderer.record(id))
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging { .. })
    }

    pub fn zoom_enabled(&self) -> bool {
        self.zoom_enabled
    }

    fn wheel_zoom(&mut self, col: u16, row: u16, factor: f64, now: Instant) {
        if !self.zoom_enabled() {
            return;
        }
        let anchor = self.pixel_at(col, row).unwrap_or_else(|| {
            let vp = &self.view.viewport;
            DVec2::new(vp.width as f64 / 2.0, vp.height as f64 / 2.0)
        });
        self.view.viewport.zoom_at(anchor.x, anchor.y, factor);
        debug!(k = self.view.viewport.scale(), "wheel zoom");
        self.update_hover(now);
    }

    fn press(&mut self, col: u16, row: u16) {
        if let Some(popup) = self.popup_rect() {
            if ui::close_control(popup).contains(Position::new(col, row)) {
                self.close_popup();
                return;
            }
            if popup.contains(Position::new(col, row)) {
                return;
            }
        }
        if self.pixel_at(col, row).is_none() {
            return;
        }

        self.gesture = Gesture::Pressed { at: (col, row) };
        self.zoom_enabled = false;
        debug!(col, row, "drag start");
    }

    fn drag(&mut self, col: u16, row: u16) {
        let (last_col, last_row) = match self.gesture {
            Gesture::Idle => return,
            Gesture::Pressed { at } => at,
            Gesture::Dragging { last } => last,
        };
        if (col, row) == (last_col, last_row) {
            return;
        }

        // Each terminal cell is 2 Braille pixels wide, 4 tall
        let dx = (col as f64 - last_col as f64) * 2.0;
        let dy = (row as f64 - last_row as f64) * 4.0;
        self.view.viewport.pan(dx, dy);
        self.gesture = Gesture::Dragging { last: (col, row) };
    }

    fn release(&mut self, col: u16, row: u16, now: Instant) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => return,
            Gesture::Pressed { .. } => {
                if let Some(id) = self.marker_under(col, row, now) {
                    self.open_popup(id);
                }
            }
            Gesture::Dragging { .. } => {}
        }

        self.zoom_enabled = true;
        self.view.viewport.constrain();
        debug!(transform = ?self.view.viewport.transform, "drag end");
        self.update_hover(now);
    }

    /// Re-run hit testing under the pointer. Hover is frozen mid-drag.
    fn update_hover(&mut self, now: Instant) {
        if self.is_dragging() {
            return;
        }
        let target = self
            .mouse_pos
            .and_then(|(col, row)| self.marker_under(col, row, now));
        self.hover.set_hovered(target, now);
    }

    fn marker_under(&self, col: u16, row: u16, now: Instant) -> Option<RecordId> {
        if self.popup_rect().is_some_and(|r| r.contains(Position::new(col, row))) {
            return None;
        }
        let pixel = self.pixel_at(col, row)?;
        self.renderer
            .marker_at(&self.view.viewport, pixel, &self.hover, now)
    }

    fn popup_rect(&self) -> Option<Rect> {
        self.view
            .popup
            .shown()
            .map(|_| ui::popup_rect(ui::map_inner(self.area)))
    }

    /// Braille pixel at the center of a terminal cell, if the cell is on the map
    pub fn pixel_at(&self, col: u16, row: u16) -> Option<DVec2> {
        let inner = ui::map_inner(self.area);
        if !inner.contains(Position::new(col, row)) {
            return None;
        }
        Some(DVec2::new(
            (col - inner.x) as f64 * 2.0 + 1.0,
            (row - inner.y) as f64 * 4.0 + 2.0,
        ))
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.view.viewport.scale())
    }

    /// Magnitudes shown at the current scale
    pub fn band_label(&self) -> String {
        match min_visible_magnitude(self.view.viewport.scale()) {
            Some(min) => format!("M{min}+"),
            None => "all".to_string(),
        }
    }

    /// Visible / total marker count
    pub fn marker_counts(&self) -> (usize, usize) {
        let scale = self.view.viewport.scale();
        (self.renderer.visible_count(scale), self.renderer.records().len())
    }

    /// Load problems for the status bar
    pub fn notices(&self) -> Vec<String> {
        let mut notices = self.warnings.clone();
        if self.skipped_records > 0 {
            notices.push(format!("{} rows skipped", self.skipped_records));
        }
        if !self.renderer.has_data() {
            notices.push("no map data loaded".to_string());
        }
        notices
    }

    /// Geographic coordinate under the pointer as a string
    pub fn pointer_coords(&self) -> Option<String> {
        let (col, row) = self.mouse_pos?;
        let pixel = self.pixel_at(col, row)?;
        let world = self.view.viewport.unproject(pixel.x, pixel.y);
        let lonlat = self.renderer.projection().invert(world);
        Some(format!(
            "{:.1}°{}, {:.1}°{}",
            lonlat.y.abs(),
            if lonlat.y >= 0.0 { "N" } else { "S" },
            lonlat.x.abs(),
            if lonlat.x >= 0.0 { "E" } else { "W" }
        ))
    }
}
