//! Append-only CSV sink for contact suggestions entered in the form.

use crate::error::WriteError;
use csv::WriterBuilder;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// A contact suggested through the form, stored verbatim
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SubmittedContact {
    #[serde(rename = "Nombre")]
    pub name: String,
    #[serde(rename = "Campo STEM")]
    pub field: String,
    #[serde(rename = "Institución")]
    pub institution: String,
    #[serde(rename = "Destacado")]
    pub highlight: String,
    #[serde(rename = "Contacto")]
    pub contact: String,
    #[serde(rename = "Departamento")]
    pub department: String,
}

/// Outcome of a successful submission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// The store was created (and its header written) by this call
    pub created: bool,
}

/// Append-only store. One writer at a time; rows are never read back.
pub struct ContactSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ContactSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record`, writing the header first if the store is new or empty.
    pub fn submit(&self, record: &SubmittedContact) -> Result<SubmitReceipt, WriteError> {
        let _guard = self.lock.lock();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        let created = file.metadata().map_err(|e| self.io_error(e))?.len() == 0;

        let mut writer = WriterBuilder::new().has_headers(created).from_writer(file);
        writer.serialize(record)?;
        writer.flush().map_err(|e| self.io_error(e))?;

        info!(path = %self.path.display(), created, "contact submission stored");
        Ok(SubmitReceipt { created })
    }

    fn io_error(&self, source: io::Error) -> WriteError {
        WriteError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
