use crate::braille::BrailleCanvas;
use crate::data::Entry;
use crate::map::geometry::{clip_segment, draw_disc, draw_line};
use crate::map::projection::Viewport;
use rayon::prelude::*;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Which outline layer a line belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutlineKind {
    /// National and neighbouring borders
    Border,
    /// Bolivian departments
    Department,
}

/// Named place drawn under the markers for orientation
#[derive(Clone, Debug)]
pub struct Place {
    pub lon: f64,
    pub lat: f64,
    pub name: String,
}

/// Display settings for map layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_borders: bool,
    pub show_departments: bool,
    pub show_places: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_borders: true,
            show_departments: true,
            show_places: true,
            show_labels: true,
        }
    }
}

/// Rendered base layers for one frame
pub struct MapLayers {
    pub borders: BrailleCanvas,
    pub departments: BrailleCanvas,
    pub places: BrailleCanvas,
    /// (column, row, text) relative to the map area
    pub labels: Vec<(u16, u16, String)>,
}

/// A directory row placed on a character cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacedMarker {
    pub col: u16,
    pub row: u16,
    /// Index into the current map view rows
    pub index: usize,
}

/// Draws the region outline and reference places behind the markers
pub struct MapRenderer {
    pub borders: Vec<LineString>,
    pub departments: Vec<LineString>,
    pub places: Vec<Place>,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            borders: Vec::new(),
            departments: Vec::new(),
            places: Vec::new(),
            settings: DisplaySettings::default(),
        }
    }

    pub fn add_outline(&mut self, line: LineString, kind: OutlineKind) {
        if line.len() < 2 {
            return;
        }
        match kind {
            OutlineKind::Border => self.borders.push(line),
            OutlineKind::Department => self.departments.push(line),
        }
    }

    pub fn add_place(&mut self, lon: f64, lat: f64, name: &str) {
        self.places.push(Place {
            lon,
            lat,
            name: name.to_string(),
        });
    }

    /// Whether any outline geometry has been loaded
    pub fn has_data(&self) -> bool {
        !self.borders.is_empty() || !self.departments.is_empty()
    }

    /// Render base layers onto canvases of `cols` x `rows` characters
    pub fn render(&self, cols: usize, rows: usize, viewport: &Viewport) -> MapLayers {
        let mut borders = BrailleCanvas::new(cols, rows);
        let mut departments = BrailleCanvas::new(cols, rows);
        let mut places = BrailleCanvas::new(cols, rows);
        let mut labels = Vec::new();

        if self.settings.show_borders {
            draw_lines(&mut borders, &self.borders, viewport);
        }
        if self.settings.show_departments {
            draw_lines(&mut departments, &self.departments, viewport);
        }

        if self.settings.show_places {
            let radius = if viewport.zoom >= 10.0 { 2 } else { 1 };
            for place in &self.places {
                let (px, py) = viewport.project(place.lon, place.lat);
                if !viewport.is_visible(px, py) {
                    continue;
                }
                draw_disc(&mut places, (px, py), radius);
                if self.settings.show_labels && px >= 0 && py >= 0 {
                    let col = (px / 2) as u16;
                    let row = (py / 4) as u16;
                    if let Some(label_col) = col.checked_add(2) {
                        labels.push((label_col, row, place.name.clone()));
                    }
                }
            }
        }

        MapLayers {
            borders,
            departments,
            places,
            labels,
        }
    }

    pub fn toggle_borders(&mut self) {
        self.settings.show_borders = !self.settings.show_borders;
    }

    pub fn toggle_departments(&mut self) {
        self.settings.show_departments = !self.settings.show_departments;
    }

    pub fn toggle_places(&mut self) {
        self.settings.show_places = !self.settings.show_places;
    }

    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Project every line in parallel, then rasterize the visible segments
fn draw_lines(canvas: &mut BrailleCanvas, lines: &[LineString], viewport: &Viewport) {
    let projected: Vec<Vec<(i32, i32)>> = lines
        .par_iter()
        .map(|line| line.iter().map(|&(lon, lat)| viewport.project(lon, lat)).collect())
        .collect();

    let (width, height) = canvas.dot_size();
    for points in &projected {
        for pair in points.windows(2) {
            if !viewport.segment_might_be_visible(pair[0], pair[1]) {
                continue;
            }
            if let Some((a, b)) = clip_segment(pair[0], pair[1], width, height) {
                draw_line(canvas, a, b);
            }
        }
    }
}

/// Place each entry on the character cell it projects to. Entries outside
/// the viewport are skipped; order follows `entries`.
pub fn place_markers(entries: &[Entry], viewport: &Viewport) -> Vec<PlacedMarker> {
    let cols = viewport.width / 2;
    let rows = viewport.height / 4;
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let (px, py) = viewport.project(entry.longitude, entry.latitude);
            if px < 0 || py < 0 {
                return None;
            }
            let (col, row) = (px as usize / 2, py as usize / 4);
            (col < cols && row < rows).then(|| PlacedMarker {
                col: col as u16,
                row: row as u16,
                index,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Rgb;

    fn entry(lon: f64, lat: f64) -> Entry {
        Entry {
            name: "Ana".into(),
            field: "Física".into(),
            institution: String::new(),
            highlight: String::new(),
            contact_url: String::new(),
            latitude: lat,
            longitude: lon,
            color: Rgb(0, 0, 0),
        }
    }

    #[test]
    fn test_outline_draws_on_visible_area() {
        let mut renderer = MapRenderer::new();
        renderer.add_outline(vec![(-66.0, -17.0), (-64.0, -17.0)], OutlineKind::Border);
        let vp = Viewport::new(-65.0, -17.0, 5.0, 80, 40);
        let layers = renderer.render(40, 10, &vp);
        assert!(!layers.borders.is_blank());
        assert!(layers.departments.is_blank());
    }

    #[test]
    fn test_hidden_layers_stay_blank() {
        let mut renderer = MapRenderer::new();
        renderer.add_outline(vec![(-66.0, -17.0), (-64.0, -17.0)], OutlineKind::Department);
        renderer.toggle_departments();
        let vp = Viewport::new(-65.0, -17.0, 5.0, 80, 40);
        assert!(renderer.render(40, 10, &vp).departments.is_blank());
    }

    #[test]
    fn test_degenerate_outline_is_ignored() {
        let mut renderer = MapRenderer::new();
        renderer.add_outline(vec![(-66.0, -17.0)], OutlineKind::Border);
        assert!(!renderer.has_data());
    }

    #[test]
    fn test_place_labels_follow_marker() {
        let mut renderer = MapRenderer::new();
        renderer.add_place(-65.0, -17.0, "Centro");
        let vp = Viewport::new(-65.0, -17.0, 5.0, 80, 40);
        let layers = renderer.render(40, 10, &vp);
        assert_eq!(layers.labels, vec![(22, 5, "Centro".to_string())]);
        assert!(!layers.places.is_blank());
    }

    #[test]
    fn test_place_markers_skips_offscreen() {
        let vp = Viewport::new(-65.0, -17.0, 5.0, 80, 40);
        let entries = vec![entry(-65.0, -17.0), entry(10.0, 45.0)];
        let markers = place_markers(&entries, &vp);
        assert_eq!(markers, vec![PlacedMarker { col: 20, row: 5, index: 0 }]);
    }
}
