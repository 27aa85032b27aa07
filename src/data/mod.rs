pub mod outline;

use crate::error::DataLoadError;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// An sRGB display color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Plotly "Prism" qualitative palette, assigned round-robin to entries
pub const PRISM: [Rgb; 11] = [
    Rgb(95, 70, 144),
    Rgb(29, 105, 150),
    Rgb(56, 166, 165),
    Rgb(15, 133, 84),
    Rgb(115, 175, 72),
    Rgb(237, 173, 8),
    Rgb(225, 124, 5),
    Rgb(204, 80, 62),
    Rgb(148, 52, 110),
    Rgb(111, 64, 112),
    Rgb(102, 102, 102),
];

/// One row of the source table before validation and coloring
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    pub name: String,
    pub field: String,
    pub institution: String,
    pub highlight: String,
    pub contact_url: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One person in the directory
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub name: String,
    /// STEM field, trimmed and never empty
    pub field: String,
    pub institution: String,
    pub highlight: String,
    pub contact_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub color: Rgb,
}

/// The prepared base table. Immutable once built; queries work on copies.
#[derive(Clone, Debug, Default)]
pub struct Directory {
    entries: Vec<Entry>,
}

impl Directory {
    /// Build from raw records with the default palette
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self::from_records_with_palette(records, &PRISM)
    }

    /// Trim categories, drop rows without one, then color by post-filter index.
    pub fn from_records_with_palette(records: impl IntoIterator<Item = Record>, palette: &[Rgb]) -> Self {
        let entries = records
            .into_iter()
            .filter_map(|record| {
                let field = record.field.trim();
                if field.is_empty() {
                    debug!(name = %record.name, "dropping row without a STEM field");
                    return None;
                }
                Some(Record {
                    field: field.to_string(),
                    ..record
                })
            })
            .enumerate()
            .map(|(i, record)| Entry {
                name: record.name,
                field: record.field,
                institution: record.institution,
                highlight: record.highlight,
                contact_url: record.contact_url,
                latitude: record.latitude,
                longitude: record.longitude,
                color: color_for(i, palette),
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct fields in first-appearance order
    pub fn fields(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.field.as_str()) {
                seen.push(entry.field.as_str());
            }
        }
        seen
    }
}

/// Round-robin palette lookup. An empty palette falls back to mid gray.
pub fn color_for(index: usize, palette: &[Rgb]) -> Rgb {
    if palette.is_empty() {
        return Rgb(128, 128, 128);
    }
    palette[index % palette.len()]
}

/// A semantic column and the headers that may carry it
struct Column {
    name: &'static str,
    headers: &'static [&'static str],
}

const NAME: Column = Column { name: "Nombre", headers: &["Nombre"] };
const FIELD: Column = Column { name: "Campo STEM", headers: &["Campo STEM"] };
const INSTITUTION: Column = Column {
    name: "Institución",
    headers: &["Institución", "Institucion"],
};
const HIGHLIGHT: Column = Column { name: "Destacado", headers: &["Destacado"] };
const CONTACT: Column = Column {
    name: "Contacto",
    headers: &["Contacto", "Contacto (página personal, otros)"],
};
const LATITUDE: Column = Column { name: "Latitud", headers: &["Latitud"] };
const LONGITUDE: Column = Column { name: "Longitud", headers: &["Longitud"] };

/// Header positions of every required column
struct ColumnIndex {
    name: usize,
    field: usize,
    institution: usize,
    highlight: usize,
    contact: usize,
    latitude: usize,
    longitude: usize,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self, DataLoadError> {
        let find = |column: &Column| {
            headers
                .iter()
                .position(|h| column.headers.contains(&h))
                .ok_or(DataLoadError::MissingColumn { column: column.name })
        };

        Ok(Self {
            name: find(&NAME)?,
            field: find(&FIELD)?,
            institution: find(&INSTITUTION)?,
            highlight: find(&HIGHLIGHT)?,
            contact: find(&CONTACT)?,
            latitude: find(&LATITUDE)?,
            longitude: find(&LONGITUDE)?,
        })
    }
}

/// Load and prepare the directory from a CSV file
pub fn load(path: &Path) -> Result<Directory, DataLoadError> {
    let file = File::open(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let directory = from_reader(file)?;
    info!(path = %path.display(), entries = directory.len(), "directory loaded");
    Ok(directory)
}

/// Prepare the directory from any CSV source
pub fn from_reader<R: Read>(reader: R) -> Result<Directory, DataLoadError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let columns = ColumnIndex::resolve(rdr.headers()?)?;

    let mut records = Vec::new();
    let mut unplaced = 0usize;
    for (row, result) in rdr.records().enumerate() {
        let raw = result?;
        let cell = |idx: usize| raw.get(idx).unwrap_or("").to_string();

        let (Some(latitude), Some(longitude)) = (
            parse_coordinate(raw.get(columns.latitude)),
            parse_coordinate(raw.get(columns.longitude)),
        ) else {
            // category-less rows are dropped regardless
            if !cell(columns.field).trim().is_empty() {
                warn!(row = row + 1, name = %cell(columns.name), "dropping row with unusable coordinates");
                unplaced += 1;
            }
            continue;
        };

        records.push(Record {
            name: cell(columns.name),
            field: cell(columns.field),
            institution: cell(columns.institution),
            highlight: cell(columns.highlight),
            contact_url: cell(columns.contact).trim().to_string(),
            latitude,
            longitude,
        });
    }

    let total = records.len();
    let directory = Directory::from_records(records);
    debug!(
        kept = directory.len(),
        without_field = total - directory.len(),
        unplaced,
        "dataset prepared"
    );
    Ok(directory)
}

fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
