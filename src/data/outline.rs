use crate::map::{LineString, MapRenderer, OutlineKind};
use crate::query::{CityAnchors, ALL_CITIES};
use anyhow::Result;
use geojson::{Feature, GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Country-border files, most detailed last
const BORDER_FILES: [&str; 3] = ["bolivia.json", "ne_50m_borders.json", "ne_10m_borders.json"];

/// Files whose features are all Bolivian departments
const DEPARTMENT_FILES: [&str; 1] = ["bolivia_departamentos.json"];

/// Admin-1 files covering the world; only Bolivian features are kept
const STATE_FILES: [&str; 2] = ["ne_10m_states.json", "ne_10m_admin_1_states_provinces.json"];

/// Load region outlines from `dir` into the renderer. Missing files are
/// skipped; unreadable ones are logged and skipped.
pub fn load_outlines(renderer: &mut MapRenderer, dir: &Path) -> Result<()> {
    for filename in BORDER_FILES {
        load_file(dir, filename, |geojson| {
            process_geojson_lines(&geojson, |_| true, |line| renderer.add_outline(line, OutlineKind::Border));
        });
    }

    for filename in DEPARTMENT_FILES {
        load_file(dir, filename, |geojson| {
            process_geojson_lines(&geojson, |_| true, |line| renderer.add_outline(line, OutlineKind::Department));
        });
    }

    for filename in STATE_FILES {
        load_file(dir, filename, |geojson| {
            process_geojson_lines(&geojson, is_bolivian, |line| {
                renderer.add_outline(line, OutlineKind::Department)
            });
        });
    }

    info!(
        borders = renderer.borders.len(),
        departments = renderer.departments.len(),
        "outlines loaded"
    );
    Ok(())
}

fn load_file(dir: &Path, filename: &str, apply: impl FnOnce(GeoJson)) {
    let path = dir.join(filename);
    if !path.exists() {
        return;
    }
    match read_geojson(&path) {
        Ok(geojson) => apply(geojson),
        Err(e) => warn!(file = filename, error = %e, "failed to load outline"),
    }
}

fn read_geojson(path: &Path) -> Result<GeoJson> {
    let mut bytes = fs::read(path)?;
    let geojson: GeoJson = simd_json::serde::from_slice(&mut bytes)?;
    Ok(geojson)
}

/// Natural Earth admin-1 features tag their country in a few ways
fn is_bolivian(feature: &Feature) -> bool {
    let Some(props) = feature.properties.as_ref() else {
        return false;
    };
    [("admin", "Bolivia"), ("adm0_a3", "BOL"), ("iso_a2", "BO")]
        .iter()
        .any(|(key, value)| props.get(*key).and_then(|v| v.as_str()) == Some(*value))
}

/// Feed every line or ring exterior of accepted features to `add_line`
fn process_geojson_lines<P, F>(geojson: &GeoJson, accept: P, mut add_line: F)
where
    P: Fn(&Feature) -> bool,
    F: FnMut(LineString),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in fc.features.iter().filter(|f| accept(*f)) {
                if let Some(geometry) = &feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(feature) => {
            if let (true, Some(geometry)) = (accept(feature), &feature.geometry) {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => process_geometry_lines(geometry, &mut add_line),
    }
}

fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(LineString),
{
    let to_line = |coords: &[Vec<f64>]| -> LineString {
        coords
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| (c[0], c[1]))
            .collect()
    };

    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => lines.iter().for_each(|l| add_line(to_line(l))),
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for exterior in polygons.iter().filter_map(|rings| rings.first()) {
                add_line(to_line(exterior));
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

/// Simplified national border, used when no outline files are available
pub fn builtin_outline(renderer: &mut MapRenderer) {
    renderer.add_outline(
        vec![
            (-69.57, -10.95), (-68.28, -11.01), (-66.65, -9.93), (-65.34, -9.76),
            (-65.04, -11.00), (-64.30, -12.46), (-63.00, -12.80), (-61.90, -13.50),
            (-60.50, -13.80), (-60.30, -15.10), (-60.20, -16.30), (-58.40, -16.30),
            (-58.30, -17.30), (-57.70, -17.55), (-57.50, -18.20), (-57.80, -19.00),
            (-58.20, -19.80), (-59.10, -19.40), (-61.70, -19.60), (-62.30, -20.50),
            (-62.70, -22.20), (-64.30, -22.80), (-64.90, -22.10), (-65.70, -22.10),
            (-66.30, -21.80), (-67.10, -22.70), (-67.80, -22.90), (-68.20, -21.50),
            (-68.70, -20.40), (-68.40, -19.40), (-69.10, -18.30), (-69.50, -17.50),
            (-69.00, -16.20), (-68.80, -15.40), (-69.40, -15.20), (-69.00, -14.20),
            (-68.90, -13.00), (-68.70, -12.50), (-69.57, -10.95),
        ],
        OutlineKind::Border,
    );
}

/// Reference places for every city anchor except the country-wide view
pub fn add_anchor_places(renderer: &mut MapRenderer, anchors: &CityAnchors) {
    for anchor in anchors.iter().filter(|a| a.name != ALL_CITIES) {
        renderer.add_place(anchor.lon, anchor.lat, &anchor.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPARTMENTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "admin": "Bolivia", "name": "Oruro" },
                "geometry": { "type": "Polygon", "coordinates": [[[-68.0, -18.0], [-67.0, -18.0], [-67.0, -19.0], [-68.0, -18.0]]] }
            },
            {
                "type": "Feature",
                "properties": { "admin": "Peru", "name": "Puno" },
                "geometry": { "type": "Polygon", "coordinates": [[[-70.0, -15.0], [-69.5, -15.0], [-69.5, -16.0], [-70.0, -15.0]]] }
            }
        ]
    }"#;

    #[test]
    fn test_state_file_keeps_only_bolivia() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ne_10m_states.json"), DEPARTMENTS).unwrap();

        let mut renderer = MapRenderer::new();
        load_outlines(&mut renderer, dir.path()).unwrap();
        assert_eq!(renderer.departments.len(), 1);
        assert_eq!(renderer.departments[0][0], (-68.0, -18.0));
        assert!(renderer.borders.is_empty());
    }

    #[test]
    fn test_border_file_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bolivia.json"), DEPARTMENTS).unwrap();

        let mut renderer = MapRenderer::new();
        load_outlines(&mut renderer, dir.path()).unwrap();
        assert_eq!(renderer.borders.len(), 2);
    }

    #[test]
    fn test_broken_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bolivia.json"), "{ not json").unwrap();

        let mut renderer = MapRenderer::new();
        assert!(load_outlines(&mut renderer, dir.path()).is_ok());
        assert!(!renderer.has_data());
    }

    #[test]
    fn test_builtin_outline_is_closed_ring() {
        let mut renderer = MapRenderer::new();
        builtin_outline(&mut renderer);
        let ring = &renderer.borders[0];
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_anchor_places_skip_country_view() {
        let mut renderer = MapRenderer::new();
        add_anchor_places(&mut renderer, &CityAnchors::bolivia());
        assert_eq!(renderer.places.len(), 5);
        assert!(renderer.places.iter().all(|p| p.name != ALL_CITIES));
    }
}
