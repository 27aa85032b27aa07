use crate::data::{Directory, Entry};
use crate::map::{place_markers, MapRenderer, MarkerGrid, PlacedMarker, Viewport, ZOOM_STEP};
use crate::query::{self, CityAnchors, FieldFilter, MapView, ALL_FIELDS};
use crate::submission::{ContactSink, SubmittedContact};
use crate::ui;
use rand::rngs::StdRng;
use ratatui::layout::Rect;
use std::io;
use tracing::{info, warn};

/// Click tolerance around a marker, in braille dots
const PICK_RADIUS_DOTS: f64 = 4.0;

/// Grid cell size for marker picking, in degrees
const MARKER_CELL_DEGREES: f64 = 0.05;

/// Form fields, in submission column order
pub const FORM_LABELS: [&str; 6] = [
    "Nombre",
    "Campo STEM",
    "Institución",
    "Destacado",
    "Contacto",
    "Departamento",
];

/// In-progress contact suggestion
#[derive(Clone, Debug, Default)]
pub struct ContactForm {
    pub values: [String; 6],
    pub focus: usize,
}

impl ContactForm {
    pub fn push(&mut self, c: char) {
        self.values[self.focus].push(c);
    }

    pub fn backspace(&mut self) {
        self.values[self.focus].pop();
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % FORM_LABELS.len();
    }

    pub fn prev_field(&mut self) {
        self.focus = (self.focus + FORM_LABELS.len() - 1) % FORM_LABELS.len();
    }

    pub fn to_contact(&self) -> SubmittedContact {
        let [name, field, institution, highlight, contact, department] = self.values.clone();
        SubmittedContact {
            name,
            field,
            institution,
            highlight,
            contact,
            department,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// One-line message shown in the status bar
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

/// Application state. Owns the immutable directory and everything the
/// event handlers touch.
pub struct App {
    directory: Directory,
    anchors: CityAnchors,
    field_options: Vec<String>,
    filter: FieldFilter,
    city: String,
    view: MapView,
    markers: MarkerGrid,
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    /// Inner map rectangle in terminal cells
    map_area: Rect,
    selected: Option<usize>,
    form: Option<ContactForm>,
    sink: Option<ContactSink>,
    status: Option<Status>,
    rng: StdRng,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
}

impl App {
    pub fn new(
        directory: Directory,
        anchors: CityAnchors,
        sink: Option<ContactSink>,
        mut rng: StdRng,
        width: u16,
        height: u16,
    ) -> Self {
        let mut field_options: Vec<String> = directory.fields().into_iter().map(str::to_string).collect();
        field_options.push(ALL_FIELDS.to_string());

        let filter = FieldFilter::All;
        let city = anchors.fallback().name.clone();
        let view = query::query(&directory, &filter, &city, &anchors, &mut rng);
        let map_area = ui::map_inner(Rect::new(0, 0, width, height));
        let viewport = Viewport::from_anchor(
            &view.anchor,
            map_area.width as usize * 2,
            map_area.height as usize * 4,
        );

        let mut app = Self {
            directory,
            anchors,
            field_options,
            filter,
            city,
            view,
            markers: MarkerGrid::new(MARKER_CELL_DEGREES),
            viewport,
            map_renderer: MapRenderer::new(),
            map_area,
            selected: None,
            form: None,
            sink,
            status: None,
            rng,
            should_quit: false,
            last_mouse: None,
        };
        app.rebuild_markers();
        app
    }

    /// Re-run the query for a new field/city selection and recenter the map.
    pub fn on_filter_change(&mut self, field: &str, city: &str) -> &MapView {
        self.filter = FieldFilter::from_option(field);
        self.city = city.to_string();
        self.view = query::query(&self.directory, &self.filter, city, &self.anchors, &mut self.rng);
        self.recenter();
        self.rebuild_markers();
        self.selected = None;
        info!(
            field = self.filter.label(),
            city = %self.view.anchor.name,
            rows = self.view.rows.len(),
            "filter changed"
        );
        &self.view
    }

    /// Step through the field options (wraps around)
    pub fn cycle_field(&mut self, step: isize) {
        let pos = self
            .field_options
            .iter()
            .position(|o| o == self.filter.label())
            .unwrap_or(self.field_options.len() - 1);
        let next = step_index(pos, step, self.field_options.len());
        let field = self.field_options[next].clone();
        let city = self.city.clone();
        self.on_filter_change(&field, &city);
    }

    /// Step through the city anchors (wraps around)
    pub fn cycle_city(&mut self, step: isize) {
        let names = self.anchors.names();
        let pos = names
            .iter()
            .position(|n| *n == self.view.anchor.name)
            .unwrap_or(names.len() - 1);
        let city = names[step_index(pos, step, names.len())].to_string();
        let field = self.filter.label().to_string();
        self.on_filter_change(&field, &city);
    }

    fn recenter(&mut self) {
        self.viewport = Viewport::from_anchor(&self.view.anchor, self.viewport.width, self.viewport.height);
    }

    fn rebuild_markers(&mut self) {
        self.markers = MarkerGrid::build(
            self.view.rows.iter().map(|e| (e.longitude, e.latitude)),
            MARKER_CELL_DEGREES,
        );
    }

    pub fn view(&self) -> &MapView {
        &self.view
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn anchors(&self) -> &CityAnchors {
        &self.anchors
    }

    pub fn filter(&self) -> &FieldFilter {
        &self.filter
    }

    pub fn field_options(&self) -> &[String] {
        &self.field_options
    }

    pub fn map_area(&self) -> Rect {
        self.map_area
    }

    /// Update map geometry when the terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.map_area = ui::map_inner(Rect::new(0, 0, width, height));
        self.viewport.width = self.map_area.width as usize * 2;
        self.viewport.height = self.map_area.height as usize * 4;
    }

    /// Terminal cell to map dot, if the cell is on the map
    fn cell_to_dot(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.map_area;
        let inside = col >= area.x && col < area.x + area.width && row >= area.y && row < area.y + area.height;
        inside.then(|| {
            (
                (col - area.x) as i32 * 2 + 1,
                (row - area.y) as i32 * 4 + 2,
            )
        })
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_dot(col, row) {
            self.viewport.zoom_at(px, py, ZOOM_STEP);
        }
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_dot(col, row) {
            self.viewport.zoom_at(px, py, -ZOOM_STEP);
        }
    }

    /// Back to the current anchor
    pub fn reset_view(&mut self) {
        self.recenter();
    }

    pub fn handle_drag(&mut self, col: u16, row: u16) {
        if let Some((last_col, last_row)) = self.last_mouse {
            let dx = (last_col as i32 - col as i32) * 2;
            let dy = (last_row as i32 - row as i32) * 4;
            self.pan(dx, dy);
        }
        self.last_mouse = Some((col, row));
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&Entry> {
        self.selected.and_then(|idx| self.view.rows.get(idx))
    }

    /// Move the selection through visible rows (wraps around)
    pub fn select_step(&mut self, step: isize) {
        let len = self.view.rows.len();
        if len == 0 {
            self.selected = None;
            return;
        }
        self.selected = Some(match self.selected {
            Some(idx) => step_index(idx, step, len),
            None if step < 0 => len - 1,
            None => 0,
        });
    }

    /// Select the marker nearest to a clicked terminal cell
    pub fn pick_at(&mut self, col: u16, row: u16) -> Option<&Entry> {
        let (px, py) = self.cell_to_dot(col, row)?;
        let (lon, lat) = self.viewport.unproject(px, py);
        let radius = self.viewport.degrees_per_dot() * PICK_RADIUS_DOTS;
        let idx = self.markers.nearest(lon, lat, radius)?;
        self.selected = Some(idx);
        self.view.rows.get(idx)
    }

    /// Markers on screen for the current view
    pub fn visible_markers(&self) -> Vec<PlacedMarker> {
        place_markers(&self.view.rows, &self.viewport)
    }

    /// Open the selected entry's contact link through `open`
    pub fn open_selected<F>(&mut self, open: F)
    where
        F: FnOnce(&str) -> io::Result<()>,
    {
        let Some(entry) = self.selected_entry() else {
            self.set_status(StatusKind::Info, "Selecciona un marcador primero");
            return;
        };
        let (name, url) = (entry.name.clone(), entry.contact_url.clone());
        if url.is_empty() {
            self.set_status(StatusKind::Info, format!("{name} no tiene enlace de contacto"));
            return;
        }
        match open(&url) {
            Ok(()) => {
                info!(%url, "opened contact link");
                self.set_status(StatusKind::Info, format!("Abriendo {url}"));
            }
            Err(e) => {
                warn!(%url, error = %e, "failed to open contact link");
                self.set_status(StatusKind::Error, format!("No se pudo abrir {url}: {e}"));
            }
        }
    }

    pub fn has_form(&self) -> bool {
        self.sink.is_some()
    }

    pub fn form(&self) -> Option<&ContactForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut ContactForm> {
        self.form.as_mut()
    }

    pub fn open_form(&mut self) {
        if self.sink.is_none() {
            self.set_status(StatusKind::Info, "Formulario desactivado (use --submissions)");
            return;
        }
        self.form.get_or_insert_with(ContactForm::default);
    }

    pub fn close_form(&mut self) {
        self.form = None;
    }

    /// Append the form to the sink. The form stays open on failure.
    pub fn submit_form(&mut self) {
        let (Some(form), Some(sink)) = (self.form.as_ref(), self.sink.as_ref()) else {
            return;
        };
        match sink.submit(&form.to_contact()) {
            Ok(_) => {
                self.form = None;
                self.set_status(StatusKind::Info, "¡Gracias! Contacto registrado");
            }
            Err(e) => {
                warn!(error = %e, "submission failed");
                self.set_status(StatusKind::Error, e.to_string());
            }
        }
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(Status {
            kind,
            text: text.into(),
        });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn zoom_level(&self) -> String {
        format!("z{:.1}", self.viewport.zoom)
    }

    pub fn center_coords(&self) -> String {
        format!(
            "{:.2}°{}, {:.2}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }
}

fn step_index(pos: usize, step: isize, len: usize) -> usize {
    (pos as isize + step).rem_euclid(len as isize) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Record;
    use crate::query::ALL_CITIES;
    use rand::SeedableRng;

    fn record(name: &str, field: &str, lat: f64, lon: f64, url: &str) -> Record {
        Record {
            name: name.into(),
            field: field.into(),
            contact_url: url.into(),
            latitude: lat,
            longitude: lon,
            ..Record::default()
        }
    }

    fn app_with(sink: Option<ContactSink>) -> App {
        let directory = Directory::from_records(vec![
            record("Ana", "Biología", -16.5, -68.15, "https://ana.example"),
            record("Bea", "Física", -17.78, -63.18, ""),
            record("Cris", "Biología", -17.78, -63.18, "https://cris.example"),
        ]);
        App::new(directory, CityAnchors::bolivia(), sink, StdRng::seed_from_u64(1), 120, 40)
    }

    #[test]
    fn test_starts_with_everything() {
        let app = app_with(None);
        assert_eq!(app.view().rows.len(), 3);
        assert_eq!(app.filter(), &FieldFilter::All);
        assert_eq!(app.view().anchor.name, ALL_CITIES);
        assert_eq!(app.field_options(), &["Biología", "Física", ALL_FIELDS]);
    }

    #[test]
    fn test_filter_change_recenters() {
        let mut app = app_with(None);
        let view = app.on_filter_change("Biología", "Santa Cruz");
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.anchor.name, "Santa Cruz");
        assert_eq!(app.viewport.zoom, 12.0);
        assert!((app.viewport.center_lon + 63.1823).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_city_uses_country_view() {
        let mut app = app_with(None);
        app.on_filter_change(ALL_FIELDS, "Cobija");
        assert_eq!(app.view().anchor.name, ALL_CITIES);
        assert_eq!(app.viewport.zoom, 5.0);
    }

    #[test]
    fn test_cycle_field_wraps() {
        let mut app = app_with(None);
        app.cycle_field(1);
        assert_eq!(app.filter().label(), "Biología");
        app.cycle_field(-1);
        assert_eq!(app.filter(), &FieldFilter::All);
    }

    #[test]
    fn test_cycle_city_keeps_field() {
        let mut app = app_with(None);
        app.on_filter_change("Física", ALL_CITIES);
        app.cycle_city(1);
        assert_eq!(app.view().anchor.name, "La Paz");
        assert_eq!(app.filter().label(), "Física");
    }

    #[test]
    fn test_select_step_wraps() {
        let mut app = app_with(None);
        app.select_step(-1);
        assert_eq!(app.selected(), Some(2));
        app.select_step(1);
        assert_eq!(app.selected(), Some(0));
    }

    #[test]
    fn test_pick_at_selects_marker_under_cursor() {
        let mut app = app_with(None);
        let marker = app
            .visible_markers()
            .into_iter()
            .find(|m| m.index == 0)
            .expect("Ana should be on screen");
        let area = app.map_area();
        let picked = app.pick_at(area.x + marker.col, area.y + marker.row).map(|e| e.name.clone());
        assert_eq!(picked.as_deref(), Some("Ana"));
        assert_eq!(app.selected(), Some(0));
    }

    #[test]
    fn test_pick_outside_map_selects_nothing() {
        let mut app = app_with(None);
        assert!(app.pick_at(0, 0).is_none());
        assert_eq!(app.selected(), None);
    }

    #[test]
    fn test_open_selected_uses_contact_url() {
        let mut app = app_with(None);
        app.select_step(1);
        let mut opened = None;
        app.open_selected(|url| {
            opened = Some(url.to_string());
            Ok(())
        });
        assert_eq!(opened.as_deref(), Some("https://ana.example"));
    }

    #[test]
    fn test_open_selected_without_url() {
        let mut app = app_with(None);
        app.on_filter_change("Física", ALL_CITIES);
        app.select_step(1);
        app.open_selected(|_| panic!("no link to open"));
        assert!(app.status().unwrap().text.contains("Bea"));
    }

    #[test]
    fn test_form_needs_sink() {
        let mut app = app_with(None);
        app.open_form();
        assert!(app.form().is_none());
        assert!(app.status().is_some());
    }

    #[test]
    fn test_form_submission_appends_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contactos.csv");
        let mut app = app_with(Some(ContactSink::new(&path)));

        app.open_form();
        for c in "Eva".chars() {
            app.form_mut().unwrap().push(c);
        }
        app.form_mut().unwrap().prev_field();
        for c in "Oruro".chars() {
            app.form_mut().unwrap().push(c);
        }
        app.submit_form();

        assert!(app.form().is_none());
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().nth(1), Some("Eva,,,,,Oruro"));
    }

    #[test]
    fn test_failed_submission_keeps_form() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(Some(ContactSink::new(dir.path().join("nope").join("c.csv"))));
        app.open_form();
        app.submit_form();
        assert!(app.form().is_some());
        assert_eq!(app.status().unwrap().kind, StatusKind::Error);
    }
}
