//! Error taxonomy for dataset access and per-row batch work

use std::path::PathBuf;

use crate::stream::StreamError;

/// Error from loading, reading or persisting the backing dataset.
///
/// None of these are row-scoped: a batch run that hits one stops.
#[derive(Debug)]
pub enum DatasetError {
    Io(std::io::Error),
    Csv(csv::Error),
    /// Required columns absent from the header row
    Malformed {
        path: PathBuf,
        missing: Vec<&'static str>,
    },
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
    /// Value could not be parsed for (or assigned to) a field
    InvalidValue {
        field: &'static str,
        value: String,
    },
    /// Rewriting the backing file failed; validity decisions may be lost
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::Csv(e) => write!(f, "CSV: {e}"),
            Self::Malformed { path, missing } => write!(
                f,
                "malformed dataset {}: missing column(s) {}",
                path.display(),
                missing.join(", ")
            ),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "row index {index} out of range (len {len})")
            }
            Self::InvalidValue { field, value } => {
                write!(f, "invalid value for {field}: {value:?}")
            }
            Self::Persistence { path, .. } => write!(f, "failed to persist {}", path.display()),
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            Self::Persistence { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for DatasetError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

/// Outcome of processing one row that did not succeed.
#[derive(Debug)]
pub enum RowError {
    /// Network fetch failed (status, transport, empty body)
    Fetch(StreamError),
    /// Destination file exists but could not be parsed
    Parse { path: PathBuf, message: String },
    /// Destination file is absent
    Missing(PathBuf),
    /// Dataset-level failure surfaced while handling the row
    Dataset(DatasetError),
}

impl RowError {
    /// Row-scoped errors are logged and skipped; everything else aborts the run.
    pub fn is_row_scoped(&self) -> bool {
        !matches!(self, Self::Dataset(_))
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "fetch failed: {e}"),
            Self::Parse { path, message } => {
                write!(f, "parse failed for {}: {message}", path.display())
            }
            Self::Missing(path) => write!(f, "file not found: {}", path.display()),
            Self::Dataset(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RowError {}

impl From<StreamError> for RowError {
    fn from(e: StreamError) -> Self {
        Self::Fetch(e)
    }
}

impl From<DatasetError> for RowError {
    fn from(e: DatasetError) -> Self {
        Self::Dataset(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn fetch_error_is_row_scoped() {
        let err = RowError::Fetch(StreamError::Http {
            status: Some(404),
            message: "test".to_string(),
        });
        assert!(err.is_row_scoped());
    }

    #[test]
    fn parse_and_missing_are_row_scoped() {
        assert!(RowError::parse("a.csv", "bad").is_row_scoped());
        assert!(RowError::Missing(PathBuf::from("a.csv")).is_row_scoped());
    }

    #[test]
    fn persistence_error_is_fatal() {
        let err = RowError::from(DatasetError::Persistence {
            path: PathBuf::from("datasource.csv"),
            source: std::io::Error::new(ErrorKind::StorageFull, "disk full"),
        });
        assert!(!err.is_row_scoped());
    }

    #[test]
    fn persistence_display_leaves_cause_to_source() {
        use std::error::Error;

        let err = DatasetError::Persistence {
            path: PathBuf::from("datasource.csv"),
            source: std::io::Error::new(ErrorKind::StorageFull, "disk full"),
        };
        assert_eq!(err.to_string(), "failed to persist datasource.csv");
        assert_eq!(err.source().map(|e| e.to_string()).as_deref(), Some("disk full"));
    }

    #[test]
    fn malformed_display_lists_columns() {
        let err = DatasetError::Malformed {
            path: PathBuf::from("datasource.csv"),
            missing: vec!["SaveAt", "Url"],
        };
        let msg = format!("{err}");
        assert!(msg.contains("SaveAt, Url"));
        assert!(msg.contains("datasource.csv"));
    }

    #[test]
    fn index_out_of_range_display() {
        let err = DatasetError::IndexOutOfRange { index: 5, len: 3 };
        assert_eq!(format!("{err}"), "row index 5 out of range (len 3)");
    }
}
