use crate::app::{App, StatusKind, FORM_LABELS};
use crate::braille::BrailleCanvas;
use crate::data::{Entry, Rgb};
use crate::map::{MapLayers, PlacedMarker};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

const PANEL_WIDTH: u16 = 38;

/// Zoom at which marker names are drawn next to markers
const LABEL_ZOOM: f64 = 9.0;

const BETA_NOTICE: &str = "Versión beta preliminar: se realizan ajustes y mejoras continuamente.";

impl From<Rgb> for Color {
    fn from(Rgb(r, g, b): Rgb) -> Self {
        Color::Rgb(r, g, b)
    }
}

/// Screen regions, computed the same way for drawing and for mouse hit tests
struct Regions {
    header: Rect,
    map: Rect,
    panel: Rect,
    status: Rect,
}

fn regions(area: Rect) -> Regions {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title + filters
            Constraint::Min(3),    // Map and panel
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    // Narrow terminals give the whole width to the map
    let panel_width = if area.width >= PANEL_WIDTH * 2 { PANEL_WIDTH } else { 0 };
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(panel_width)])
        .split(rows[1]);

    Regions {
        header: rows[0],
        map: body[0],
        panel: body[1],
        status: rows[2],
    }
}

fn map_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Bolivia ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Inner map rectangle for a terminal of size `area`
pub fn map_inner(area: Rect) -> Rect {
    map_block().inner(regions(area).map)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let regions = regions(frame.area());

    render_header(frame, app, regions.header);
    render_map(frame, app, regions.map);
    if regions.panel.width > 0 {
        render_panel(frame, app, regions.panel);
    }
    render_status_bar(frame, app, regions.status);

    if let Some(form) = app.form() {
        render_form(frame, form, regions.map);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::Yellow);

    let lines = vec![
        Line::from(Span::styled(
            " Mujeres STEM Bolivia",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(" [f] Campo STEM: ", dim),
            Span::styled(app.filter().label().to_string(), value),
            Span::styled("   [c] Ciudad: ", dim),
            Span::styled(app.view().anchor.name.clone(), value),
            Span::styled(format!("   {} personas", app.view().rows.len()), dim),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = map_block();
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layers = app
        .map_renderer
        .render(inner.width as usize, inner.height as usize, &app.viewport);

    let show_names = app.map_renderer.settings.show_labels && app.viewport.zoom >= LABEL_ZOOM;
    let markers = app
        .visible_markers()
        .into_iter()
        .map(|placed| {
            let entry = &app.view().rows[placed.index];
            MarkerGlyph {
                placed,
                color: entry.color.into(),
                selected: app.selected() == Some(placed.index),
                label: show_names.then(|| entry.name.clone()),
            }
        })
        .collect();

    frame.render_widget(MapWidget { layers, markers }, inner);
}

struct MarkerGlyph {
    placed: PlacedMarker,
    color: Color,
    selected: bool,
    label: Option<String>,
}

/// Braille base layers with colored directory markers on top
struct MapWidget {
    layers: MapLayers,
    markers: Vec<MarkerGlyph>,
}

impl MapWidget {
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height {
            for (col, ch) in canvas.row(row as usize).take(area.width as usize).enumerate() {
                if ch == '\u{2800}' {
                    continue;
                }
                buf[(area.x + col as u16, area.y + row)].set_char(ch).set_fg(color);
            }
        }
    }

    fn put_text(text: &str, x: u16, y: u16, style: Style, area: Rect, buf: &mut Buffer) {
        for (i, ch) in text.chars().enumerate() {
            let px = x + i as u16;
            if px >= area.x + area.width {
                break;
            }
            buf[(px, y)].set_char(ch).set_style(style);
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front: departments, borders, reference places
        Self::render_layer(&self.layers.departments, Color::DarkGray, area, buf);
        Self::render_layer(&self.layers.borders, Color::Cyan, area, buf);
        Self::render_layer(&self.layers.places, Color::Gray, area, buf);

        let place_style = Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC);
        for (col, row, text) in &self.layers.labels {
            if *row >= area.height || *col >= area.width {
                continue;
            }
            Self::put_text(text, area.x + col, area.y + row, place_style, area, buf);
        }

        // Selected marker last so it is never hidden
        let mut markers = self.markers;
        markers.sort_by_key(|m| m.selected);
        for marker in &markers {
            let x = area.x + marker.placed.col;
            let y = area.y + marker.placed.row;
            if x >= area.x + area.width || y >= area.y + area.height {
                continue;
            }
            let (glyph, style) = if marker.selected {
                ('◉', Style::default().fg(Color::White).bg(marker.color).add_modifier(Modifier::BOLD))
            } else {
                ('●', Style::default().fg(marker.color))
            };
            buf[(x, y)].set_char(glyph).set_style(style);

            if let Some(label) = &marker.label {
                let label: String = label.chars().take(24).collect();
                Self::put_text(&label, x + 2, y, Style::default().fg(marker.color), area, buf);
            }
        }
    }
}

fn render_panel(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Detalle ");

    let lines = match app.selected_entry() {
        Some(entry) => entry_lines(entry),
        None => help_lines(app),
    };

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn entry_lines(entry: &Entry) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::DarkGray);
    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };

    vec![
        Line::from(Span::styled(
            entry.name.clone(),
            Style::default().fg(entry.color.into()).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("Campo STEM", label)),
        Line::from(entry.field.clone()),
        Line::from(Span::styled("Institución", label)),
        Line::from(or_dash(&entry.institution)),
        Line::from(Span::styled("Destacado", label)),
        Line::from(or_dash(&entry.highlight)),
        Line::from(Span::styled("Contacto", label)),
        Line::from(Span::styled(
            or_dash(&entry.contact_url),
            Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
        )),
        Line::from(""),
        Line::from(Span::styled("Enter: abrir contacto", label)),
    ]
}

fn help_lines(app: &App) -> Vec<Line<'static>> {
    let key = Style::default().fg(Color::Yellow);
    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from("Mujeres bolivianas que lideran en ciencia, tecnología, ingeniería y matemáticas."),
        Line::from(""),
        Line::from(vec![Span::styled("f/F ", key), Span::raw("campo STEM")]),
        Line::from(vec![Span::styled("c/C ", key), Span::raw("ciudad")]),
        Line::from(vec![Span::styled("Tab ", key), Span::raw("siguiente persona")]),
        Line::from(vec![Span::styled("clic ", key), Span::raw("seleccionar marcador")]),
        Line::from(vec![Span::styled("Enter ", key), Span::raw("abrir contacto")]),
    ];
    if app.has_form() {
        lines.push(Line::from(vec![Span::styled("n ", key), Span::raw("sugerir un contacto")]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        BETA_NOTICE,
        dim.add_modifier(Modifier::ITALIC),
    )));
    lines
}

fn render_form(frame: &mut Frame, form: &crate::app::ContactForm, over: Rect) {
    let width = over.width.clamp(20, 60);
    let height = (FORM_LABELS.len() as u16 + 4).min(over.height);
    let area = Rect::new(
        over.x + over.width.saturating_sub(width) / 2,
        over.y + over.height.saturating_sub(height) / 2,
        width.min(over.width),
        height,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Sugerir contacto ");

    let mut lines: Vec<Line> = FORM_LABELS
        .iter()
        .zip(form.values.iter())
        .enumerate()
        .map(|(i, (label, value))| {
            let focused = i == form.focus;
            let label_style = if focused {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let mut spans = vec![
                Span::styled(format!("{label:>13}: "), label_style),
                Span::raw(value.clone()),
            ];
            if focused {
                spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
            }
            Line::from(spans)
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab: siguiente  Enter: enviar  Esc: cancelar",
        Style::default().fg(Color::DarkGray),
    )));

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);

    let line = match app.status() {
        Some(status) => {
            let color = match status.kind {
                StatusKind::Info => Color::Green,
                StatusKind::Error => Color::Red,
            };
            Line::from(Span::styled(format!(" {}", status.text), Style::default().fg(color)))
        }
        None => {
            let settings = &app.map_renderer.settings;
            let toggle = |on: bool, text: &'static str| {
                Span::styled(text, Style::default().fg(if on { Color::Green } else { Color::DarkGray }))
            };
            Line::from(vec![
                Span::styled(" Zoom: ", dim),
                Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
                Span::raw(" "),
                toggle(settings.show_borders, "[b]orde "),
                toggle(settings.show_departments, "[d]epto "),
                toggle(settings.show_places, "[p]ciudades "),
                toggle(settings.show_labels, "[L]etreros "),
                Span::styled("| ", dim),
                Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
                Span::styled(" | hjkl:mover +/-:zoom r:centrar q:salir", dim),
            ])
        }
    };

    frame.render_widget(Paragraph::new(line), area);
}
