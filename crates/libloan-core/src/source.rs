//! File-backed row storage.
//!
//! The whole dataset lives in memory. Every mutation rewrites the backing
//! file (tmp → fsync → rename) before returning, so the on-disk copy always
//! reflects every decision made so far.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::DatasetError;
use crate::row::{COLUMNS, Field, FieldValue, Row};

/// Ordered rows loaded from a dataset CSV file
#[derive(Debug)]
pub struct RowSource {
    path: PathBuf,
    base_dir: PathBuf,
    rows: Vec<Row>,
    revision: usize,
}

impl RowSource {
    /// Parse a dataset file.
    ///
    /// Fails with [`DatasetError::Malformed`] before reading any record if a
    /// required column is missing from the header.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        let missing: Vec<&'static str> = COLUMNS
            .into_iter()
            .filter(|col| !headers.iter().any(|h| h.trim_start_matches('\u{feff}') == *col))
            .collect();
        if !missing.is_empty() {
            return Err(DatasetError::Malformed {
                path: path.to_path_buf(),
                missing,
            });
        }

        let rows = reader
            .deserialize::<Row>()
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("Loaded {} rows from {}", rows.len(), path.display());
        Ok(Self::with_rows(path, rows))
    }

    /// Write `rows` as a fresh dataset at `path`, replacing any existing file.
    pub fn create(path: impl AsRef<Path>, rows: Vec<Row>) -> Result<Self, DatasetError> {
        let mut source = Self::with_rows(path.as_ref(), rows);
        source.persist()?;
        Ok(source)
    }

    fn with_rows(path: &Path, rows: Vec<Row>) -> Self {
        let base_dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            path: path.to_path_buf(),
            base_dir,
            rows,
            revision: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Row, DatasetError> {
        self.rows.get(index).ok_or(DatasetError::IndexOutOfRange {
            index,
            len: self.rows.len(),
        })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that relative `SaveAt` paths are resolved against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Absolute (or base-relative) destination of a row
    pub fn resolve(&self, row: &Row) -> PathBuf {
        self.base_dir.join(&row.save_at)
    }

    /// Number of rewrites performed through this instance
    pub fn revision(&self) -> usize {
        self.revision
    }

    /// Update one field of one row and durably rewrite the backing file.
    pub fn set_field(
        &mut self,
        index: usize,
        field: Field,
        value: impl Into<FieldValue>,
    ) -> Result<(), DatasetError> {
        let len = self.rows.len();
        let row = self
            .rows
            .get_mut(index)
            .ok_or(DatasetError::IndexOutOfRange { index, len })?;
        row.set(field, value.into())?;
        self.persist()
    }

    /// Exclude a row from future downloads.
    pub fn mark_invalid(&mut self, index: usize) -> Result<(), DatasetError> {
        self.set_field(index, Field::ValidUrl, false)
    }

    /// Rewrite the whole file, header included, via tmp → rename.
    pub fn persist(&mut self) -> Result<(), DatasetError> {
        let tmp_path = tmp_path_for(&self.path);
        self.write_to(&tmp_path)
            .and_then(|()| fs::rename(&tmp_path, &self.path))
            .map_err(|source| {
                let _ = fs::remove_file(&tmp_path);
                DatasetError::Persistence {
                    path: self.path.clone(),
                    source,
                }
            })?;
        self.revision += 1;
        log::debug!(
            "Persisted {} rows to {} (revision {})",
            self.rows.len(),
            self.path.display(),
            self.revision
        );
        Ok(())
    }

    fn write_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(File::create(path)?);
        writer.write_record(COLUMNS)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

/// `<name>.tmp` sibling used for atomic replacement
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `contents` to `path` atomically, creating parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = tmp_path_for(path);
    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// A destination counts as done when it exists and is non-empty.
pub fn is_complete(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}
