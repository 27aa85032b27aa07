//! Map query engine: category filter, city anchor lookup and marker jitter.
//!
//! Every call works on a copy of the directory rows. Jitter draws from the
//! caller's random source, so two calls with an unseeded source place
//! duplicated markers differently.

use crate::data::{Directory, Entry};
use rand::Rng;
use std::collections::hash_map::{Entry as Slot, HashMap};
use tracing::debug;

/// Category option that disables the field filter
pub const ALL_FIELDS: &str = "Todos los campos";

/// City option for the whole-country view
pub const ALL_CITIES: &str = "Todos";

/// Jitter scale at country-level zoom
pub const COARSE_JITTER: f64 = 0.01;

/// Jitter scale at city-level zoom
pub const FINE_JITTER: f64 = 0.001;

/// Exact-match category filter
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldFilter {
    All,
    Exact(String),
}

impl FieldFilter {
    /// Interpret a dropdown value; the "all" sentinel disables filtering.
    pub fn from_option(value: &str) -> Self {
        if value == ALL_FIELDS {
            FieldFilter::All
        } else {
            FieldFilter::Exact(value.to_string())
        }
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            FieldFilter::All => true,
            FieldFilter::Exact(field) => entry.field == *field,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FieldFilter::All => ALL_FIELDS,
            FieldFilter::Exact(field) => field,
        }
    }
}

/// Named map center
#[derive(Clone, Debug, PartialEq)]
pub struct CityAnchor {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Web-map zoom level
    pub zoom: f64,
}

impl CityAnchor {
    pub fn new(name: &str, lat: f64, lon: f64, zoom: f64) -> Self {
        Self {
            name: name.to_string(),
            lat,
            lon,
            zoom,
        }
    }
}

/// Static table of city anchors with a whole-region fallback
#[derive(Clone, Debug)]
pub struct CityAnchors {
    anchors: Vec<CityAnchor>,
    fallback: usize,
}

impl CityAnchors {
    /// Build a table; `fallback` is appended and used for unknown keys.
    pub fn new(cities: Vec<CityAnchor>, fallback: CityAnchor) -> Self {
        let mut anchors = cities;
        anchors.push(fallback);
        let fallback = anchors.len() - 1;
        Self { anchors, fallback }
    }

    /// Department capitals plus the country-wide view
    pub fn bolivia() -> Self {
        Self::new(
            vec![
                CityAnchor::new("La Paz", -16.5000, -68.1500, 12.0),
                CityAnchor::new("Cochabamba", -17.3895, -66.1568, 12.0),
                CityAnchor::new("Santa Cruz", -17.7833, -63.1823, 12.0),
                CityAnchor::new("Tarija", -21.5333, -64.7333, 12.0),
                CityAnchor::new("Sucre", -19.0333, -65.2627, 12.0),
            ],
            CityAnchor::new(ALL_CITIES, -17.0, -65.0, 5.0),
        )
    }

    /// Anchor for `key`, or the whole-region anchor when the key is unknown
    pub fn resolve(&self, key: &str) -> &CityAnchor {
        self.anchors
            .iter()
            .find(|a| a.name == key)
            .unwrap_or(&self.anchors[self.fallback])
    }

    pub fn fallback(&self) -> &CityAnchor {
        &self.anchors[self.fallback]
    }

    /// Anchors in display order, fallback last
    pub fn iter(&self) -> impl Iterator<Item = &CityAnchor> {
        self.anchors.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.anchors.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

impl Default for CityAnchors {
    fn default() -> Self {
        Self::bolivia()
    }
}

/// Render-ready result of one query
#[derive(Clone, Debug)]
pub struct MapView {
    pub rows: Vec<Entry>,
    pub anchor: CityAnchor,
}

/// Filter, recenter and de-overlap the directory for display
pub fn query<R: Rng + ?Sized>(
    directory: &Directory,
    filter: &FieldFilter,
    city: &str,
    anchors: &CityAnchors,
    rng: &mut R,
) -> MapView {
    let anchor = anchors.resolve(city).clone();
    let mut rows: Vec<Entry> = directory
        .entries()
        .iter()
        .filter(|e| filter.matches(e))
        .cloned()
        .collect();

    let moved = jitter(&mut rows, anchor.zoom, rng);
    debug!(
        filter = filter.label(),
        city = %anchor.name,
        rows = rows.len(),
        moved,
        "map query"
    );

    MapView { rows, anchor }
}

/// Jitter scale for a zoom level
pub fn jitter_factor(zoom: f64) -> f64 {
    if zoom <= 5.0 {
        COARSE_JITTER
    } else {
        FINE_JITTER
    }
}

/// Hashable identity of an exact coordinate pair. `+ 0.0` folds -0.0 into 0.0
/// so both compare equal, as they do as floats.
#[inline(always)]
fn coordinate_key(lat: f64, lon: f64) -> (u64, u64) {
    ((lat + 0.0).to_bits(), (lon + 0.0).to_bits())
}

/// Displace repeated coordinates so every marker stays clickable.
///
/// The first row at a given exact (lat, lon) stays put. The n-th repeat moves
/// each axis by an independent `uniform(-factor, factor) * n`. Rows whose
/// coordinates are close but not bit-identical are left alone. Returns the
/// number of rows moved.
pub fn jitter<R: Rng + ?Sized>(rows: &mut [Entry], zoom: f64, rng: &mut R) -> usize {
    let factor = jitter_factor(zoom);
    let mut seen: HashMap<(u64, u64), u32> = HashMap::new();
    let mut moved = 0;

    for entry in rows.iter_mut() {
        match seen.entry(coordinate_key(entry.latitude, entry.longitude)) {
            Slot::Occupied(mut slot) => {
                *slot.get_mut() += 1;
                let rank = *slot.get() as f64;
                entry.latitude += rng.random_range(-factor..=factor) * rank;
                entry.longitude += rng.random_range(-factor..=factor) * rank;
                moved += 1;
            }
            Slot::Vacant(slot) => {
                slot.insert(0);
            }
        }
    }

    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Record;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record(name: &str, field: &str, lat: f64, lon: f64) -> Record {
        Record {
            name: name.into(),
            field: field.into(),
            latitude: lat,
            longitude: lon,
            ..Record::default()
        }
    }

    fn directory() -> Directory {
        Directory::from_records(vec![
            record("Ana", "Biología", -16.5, -68.15),
            record("Bea", "Física", -17.78, -63.18),
            record("Cris", "Biología", -17.78, -63.18),
            record("Dora", "Química", -19.03, -65.26),
        ])
    }

    #[test]
    fn test_all_filter_keeps_every_row_in_order() {
        let dir = directory();
        let mut rng = StdRng::seed_from_u64(7);
        let view = query(&dir, &FieldFilter::All, ALL_CITIES, &CityAnchors::bolivia(), &mut rng);
        let names: Vec<&str> = view.rows.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bea", "Cris", "Dora"]);
    }

    #[test]
    fn test_exact_filter() {
        let dir = directory();
        let mut rng = StdRng::seed_from_u64(7);
        let filter = FieldFilter::from_option("Biología");
        let view = query(&dir, &filter, ALL_CITIES, &CityAnchors::bolivia(), &mut rng);
        assert_eq!(view.rows.len(), 2);
        assert!(view.rows.iter().all(|e| e.field == "Biología"));
    }

    #[test]
    fn test_filter_is_not_fuzzy() {
        let dir = directory();
        let mut rng = StdRng::seed_from_u64(7);
        for value in ["biología", "Bio", "Biología "] {
            let view = query(&dir, &FieldFilter::from_option(value), ALL_CITIES, &CityAnchors::bolivia(), &mut rng);
            assert!(view.rows.is_empty(), "{value:?} should match nothing");
        }
    }

    #[test]
    fn test_sentinel_maps_to_all() {
        assert_eq!(FieldFilter::from_option(ALL_FIELDS), FieldFilter::All);
        assert_eq!(FieldFilter::All.label(), ALL_FIELDS);
    }

    #[test]
    fn test_unknown_city_falls_back() {
        let anchors = CityAnchors::bolivia();
        assert_eq!(anchors.resolve("Atlantis"), anchors.resolve(ALL_CITIES));
        assert_eq!(anchors.resolve("Atlantis").zoom, 5.0);
        assert_eq!(anchors.resolve("Sucre").zoom, 12.0);
    }

    #[test]
    fn test_colors_survive_query() {
        let dir = directory();
        let mut rng = StdRng::seed_from_u64(1);
        let view = query(&dir, &FieldFilter::from_option("Química"), "La Paz", &CityAnchors::bolivia(), &mut rng);
        assert_eq!(view.rows[0].color, dir.entries()[3].color);
    }

    #[test]
    fn test_query_leaves_directory_untouched() {
        let dir = directory();
        let before = dir.entries().to_vec();
        let mut rng = StdRng::seed_from_u64(3);
        let _ = query(&dir, &FieldFilter::All, ALL_CITIES, &CityAnchors::bolivia(), &mut rng);
        assert_eq!(dir.entries(), before.as_slice());
    }

    #[test]
    fn test_two_overlapping_entries_at_country_zoom() {
        let dir = directory();
        let mut rng = StdRng::seed_from_u64(42);
        let view = query(&dir, &FieldFilter::All, ALL_CITIES, &CityAnchors::bolivia(), &mut rng);
        let (bea, cris) = (&view.rows[1], &view.rows[2]);
        assert_eq!((bea.latitude, bea.longitude), (-17.78, -63.18));
        assert!((-17.79 - 1e-12..=-17.77 + 1e-12).contains(&cris.latitude));
        assert!((-63.19 - 1e-12..=-63.17 + 1e-12).contains(&cris.longitude));
        assert_ne!((cris.latitude, cris.longitude), (-17.78, -63.18));
    }

    #[test]
    fn test_jitter_factor_by_zoom() {
        assert_eq!(jitter_factor(5.0), COARSE_JITTER);
        assert_eq!(jitter_factor(3.0), COARSE_JITTER);
        assert_eq!(jitter_factor(12.0), FINE_JITTER);
    }

    #[test]
    fn test_empty_directory_yields_empty_view() {
        let dir = Directory::default();
        let mut rng = StdRng::seed_from_u64(0);
        let view = query(&dir, &FieldFilter::All, "Tarija", &CityAnchors::bolivia(), &mut rng);
        assert!(view.rows.is_empty());
        assert_eq!(view.anchor.name, "Tarija");
    }

    #[test]
    fn test_seeded_jitter_is_reproducible() {
        let dir = directory();
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            query(&dir, &FieldFilter::All, ALL_CITIES, &CityAnchors::bolivia(), &mut rng).rows
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn test_negative_zero_counts_as_same_place() {
        let mut rows = Directory::from_records(vec![
            record("a", "Física", 0.0, 0.0),
            record("b", "Física", -0.0, -0.0),
        ])
        .entries()
        .to_vec();
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(jitter(&mut rows, 5.0, &mut rng), 1);
    }

    #[test]
    fn test_near_duplicates_are_not_moved() {
        let mut rows = Directory::from_records(vec![
            record("a", "Física", -16.5, -68.15),
            record("b", "Física", -16.5000001, -68.15),
        ])
        .entries()
        .to_vec();
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(jitter(&mut rows, 5.0, &mut rng), 0);
        assert_eq!(rows[1].latitude, -16.5000001);
    }
}
