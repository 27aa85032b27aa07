use crate::query::{ALL_CITIES, ALL_FIELDS};
use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Terminal map of women working in STEM across Bolivia
#[derive(Debug, Parser)]
#[command(name = "stem-map", version, about)]
pub struct Args {
    /// Directory CSV (Nombre, Campo STEM, Institución, Destacado, Contacto, Latitud, Longitud)
    #[arg(long, env = "STEM_MAP_DATA", default_value = "data/mujeres_stem_bolivia.csv")]
    pub data: PathBuf,

    /// CSV that receives contact suggestions; enables the form when set
    #[arg(long, env = "STEM_MAP_SUBMISSIONS")]
    pub submissions: Option<PathBuf>,

    /// Directory with GeoJSON outlines of Bolivia
    #[arg(long, env = "STEM_MAP_OUTLINES", default_value = "data")]
    pub outline_dir: PathBuf,

    /// Initial city anchor
    #[arg(long, default_value = ALL_CITIES)]
    pub city: String,

    /// Initial STEM field filter
    #[arg(long, default_value = ALL_FIELDS)]
    pub field: String,

    /// Seed for marker jitter; random when omitted
    #[arg(long, env = "STEM_MAP_SEED")]
    pub seed: Option<u64>,

    /// Log file (the terminal belongs to the map)
    #[arg(long, env = "STEM_MAP_LOG", default_value = "stem-map.log")]
    pub log_file: PathBuf,
}

impl Args {
    /// Random source for jitter
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// Send `tracing` output to `path`. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init_logging(path: &Path) -> Result<WorkerGuard> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating log directory {}", dir.display()))?;
    let filename = path
        .file_name()
        .with_context(|| format!("log path {} has no file name", path.display()))?;

    let appender = tracing_appender::rolling::never(dir, filename);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stem_map=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["stem-map"]).unwrap();
        assert_eq!(args.city, ALL_CITIES);
        assert_eq!(args.field, ALL_FIELDS);
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "stem-map",
            "--data",
            "people.csv",
            "--submissions",
            "out.csv",
            "--city",
            "Sucre",
            "--seed",
            "11",
        ])
        .unwrap();
        assert_eq!(args.data, PathBuf::from("people.csv"));
        assert_eq!(args.submissions, Some(PathBuf::from("out.csv")));
        assert_eq!(args.city, "Sucre");
        assert_eq!(args.seed, Some(11));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        use rand::Rng;
        let args = Args::try_parse_from(["stem-map", "--seed", "4"]).unwrap();
        let a: u64 = args.rng().random();
        let b: u64 = args.rng().random();
        assert_eq!(a, b);
    }
}
