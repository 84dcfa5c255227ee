//! CSV persistence
//!
//! Each output is written to a temporary file next to its destination and renamed into
//! place once complete, so a failed write never leaves a truncated file behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::domain::constants::csv_schema::COLUMNS;
use crate::domain::record::NormalizedRecord;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error while writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV encoding failed for {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Could not move finished file into {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvWriter;

impl CsvWriter {
    /// Writes `records` to `path` with a header row, replacing any existing file
    pub fn write(&self, path: &Path, records: &[NormalizedRecord]) -> Result<PathBuf, PersistError> {
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |source: std::io::Error| PersistError::Io {
            path: path.to_path_buf(),
            source,
        };
        let csv_err = |source: csv::Error| PersistError::Csv {
            path: path.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(&parent).map_err(io_err)?;
        // Dropping the temp file on any early return removes it
        let temp = tempfile::NamedTempFile::new_in(&parent).map_err(io_err)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(temp);
        writer.write_record(COLUMNS).map_err(csv_err)?;
        for record in records {
            writer.serialize(record).map_err(csv_err)?;
        }

        let mut temp = writer
            .into_inner()
            .map_err(|e| io_err(e.into_error()))?;
        temp.flush().map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;

        temp.persist(path).map_err(|source| PersistError::Persist {
            path: path.to_path_buf(),
            source,
        })?;

        info!("💾 Wrote {} rows to {}", records.len(), path.display());
        Ok(path.to_path_buf())
    }
}
