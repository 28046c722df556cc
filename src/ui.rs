use std::time::Instant;

use crate::app::{popup_fields, App};
use crate::braille::BrailleCanvas;
use crate::map::{Emphasis, MapLayers, MarkerColor};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

/// Map background (#333)
const BACKGROUND: Color = Color::Rgb(0x33, 0x33, 0x33);
/// Non-polygon boundary geometry
const OVERLAY: Color = Color::Rgb(0xad, 0xd8, 0xe6);

const POPUP_WIDTH: u16 = 46;
/// 8 fields plus borders
const POPUP_HEIGHT: u16 = 10;

/// Split the terminal into the map area and the status bar
fn split(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
        ])
        .split(area);
    (chunks[0], chunks[1])
}

fn map_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Earthquakes ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
}

/// Cells the Braille map is drawn into
pub fn map_inner(area: Rect) -> Rect {
    map_block().inner(split(area).0)
}

/// Popup panel, anchored to the top-right corner of the map
pub fn popup_rect(inner: Rect) -> Rect {
    let width = POPUP_WIDTH.min(inner.width);
    let height = POPUP_HEIGHT.min(inner.height);
    Rect {
        x: inner.right() - width,
        y: inner.y,
        width,
        height,
    }
}

/// The `[x]` close control on the popup's top border
pub fn close_control(popup: Rect) -> Rect {
    Rect {
        x: popup.right().saturating_sub(4).max(popup.x),
        y: popup.y,
        width: 3.min(popup.width),
        height: 1,
    }
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App, now: Instant) {
    let (map_area, status_area) = split(frame.area());

    render_map(frame, app, map_area, now);
    render_popup(frame, app);
    render_status_bar(frame, app, status_area);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect, now: Instant) {
    let block = map_block();
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layers = app.renderer.render(
        inner.width as usize,
        inner.height as usize,
        &app.view.viewport,
        &app.hover,
        now,
    );
    frame.render_widget(MapWidget { layers }, inner);
}

/// Braille map layers drawn over the background
struct MapWidget {
    layers: MapLayers,
}

impl MapWidget {
    /// Render a braille canvas layer with a specific style
    fn render_layer(canvas: &BrailleCanvas, style: Style, area: Rect, buf: &mut Buffer) {
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                let x = area.x + col_idx as u16;
                buf[(x, y)].set_char(ch).set_style(style);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Style::default().bg(BACKGROUND));

        // Back to front: land, other boundaries, markers
        Self::render_layer(&self.layers.land, Style::default().fg(Color::Black), area, buf);
        Self::render_layer(&self.layers.overlay, Style::default().fg(OVERLAY), area, buf);
        for layer in &self.layers.markers {
            Self::render_layer(&layer.canvas, marker_style(layer.color, layer.emphasis), area, buf);
        }
    }
}

fn marker_color(color: MarkerColor) -> Color {
    let (r, g, b) = color.rgb();
    Color::Rgb(r, g, b)
}

fn marker_style(color: MarkerColor, emphasis: Emphasis) -> Style {
    let style = Style::default().fg(marker_color(color));
    match emphasis {
        Emphasis::Faint => style.add_modifier(Modifier::DIM),
        Emphasis::Normal => style,
        Emphasis::Strong => style.add_modifier(Modifier::BOLD),
    }
}

fn render_popup(frame: &mut Frame, app: &App) {
    let Some(record) = app.popup_record() else {
        return;
    };
    let area = popup_rect(map_inner(frame.area()));

    let label_style = Style::default().fg(Color::DarkGray);
    let lines: Vec<Line> = popup_fields(record)
        .into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{label}: "), label_style),
                Span::raw(value),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(Span::styled(
            " Earthquake ",
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .title_top(Line::from(Span::styled("[x]", Style::default().fg(Color::Red))).right_aligned());

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let (visible, total) = app.marker_counts();

    let mut spans = vec![
        Span::styled(" Zoom: ", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" (", dim),
        Span::styled(app.band_label(), Style::default().fg(Color::Magenta)),
        Span::styled(") ", dim),
        Span::styled(format!("{visible}/{total} "), Style::default().fg(Color::White)),
    ];

    for color in MarkerColor::ALL {
        spans.push(Span::styled("● ", Style::default().fg(marker_color(color))));
        spans.push(Span::styled(format!("{} ", color.label()), dim));
    }

    if let Some(coords) = app.pointer_coords() {
        spans.push(Span::styled("| ", dim));
        spans.push(Span::styled(coords, Style::default().fg(Color::Cyan)));
        spans.push(Span::raw(" "));
    }

    for notice in app.notices() {
        spans.push(Span::styled(format!("| {notice} "), Style::default().fg(Color::Red)));
    }

    spans.push(Span::styled(
        "| drag/hjkl:pan wheel/+/-:zoom click/enter:details r:reset q:quit",
        dim,
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
