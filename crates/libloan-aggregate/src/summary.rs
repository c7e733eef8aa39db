//! Per-file column sums and the accumulated summary table

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use libloan_core::batcher::RowSpan;
use libloan_core::error::{DatasetError, RowError};
use libloan_core::source::write_atomic;

/// One summarized loan-list file
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub library: String,
    pub year: i32,
    pub month: u32,
    /// One total per configured sum column, same order
    pub sums: Vec<f64>,
}

/// Sum `columns` over every record of the CSV at `path`.
///
/// An absent file is [`RowError::Missing`]; a file without one of the
/// columns, or with a non-numeric cell in one, is [`RowError::Parse`].
/// Empty cells count as zero.
pub fn sum_columns(path: &Path, columns: &[String]) -> Result<Vec<f64>, RowError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RowError::Missing(path.to_path_buf()));
        }
        Err(e) => return Err(RowError::parse(path, e.to_string())),
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(io::BufReader::new(file));

    let headers = reader
        .headers()
        .map_err(|e| RowError::parse(path, e.to_string()))?
        .clone();
    let header_names: Vec<&str> = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim())
        .collect();

    let mut positions = Vec::with_capacity(columns.len());
    let mut missing = Vec::new();
    for col in columns {
        match header_names.iter().position(|h| *h == col.as_str()) {
            Some(pos) => positions.push(pos),
            None => missing.push(col.as_str()),
        }
    }
    if !missing.is_empty() {
        return Err(RowError::parse(
            path,
            format!(
                "missing column(s) {} (found: {})",
                missing.join(", "),
                header_names.join(", ")
            ),
        ));
    }

    let mut sums = vec![0.0; columns.len()];
    for (lineno, record) in reader.records().enumerate() {
        let record = record.map_err(|e| RowError::parse(path, e.to_string()))?;
        for (slot, &pos) in positions.iter().enumerate() {
            let cell = record.get(pos).unwrap_or("");
            sums[slot] += parse_number(cell).ok_or_else(|| {
                RowError::parse(
                    path,
                    format!("line {}: {} is not a number: {cell:?}", lineno + 2, columns[slot]),
                )
            })?;
        }
    }
    Ok(sums)
}

/// Lenient number parsing: blanks are zero, thousands separators are ignored.
fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Some(0.0);
    }
    cell.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Accumulated output of an aggregation run
#[derive(Debug, Clone)]
pub struct SummaryTable {
    sum_columns: Vec<String>,
    rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn new(sum_columns: Vec<String>) -> Self {
        Self {
            sum_columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: SummaryRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    /// Rough heap footprint, for the memory line in progress logs
    pub fn approx_bytes(&self) -> u64 {
        let per_row = std::mem::size_of::<SummaryRow>() + self.sum_columns.len() * 8;
        let strings: usize = self.rows.iter().map(|r| r.library.len()).sum();
        (self.rows.len() * per_row + strings) as u64
    }

    /// Render as CSV: identity columns first, then one column per sum.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut header = vec!["LibraryName", "Year", "Month"];
        header.extend(self.sum_columns.iter().map(String::as_str));
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.library.clone(), row.year.to_string(), row.month.to_string()];
            record.extend(row.sums.iter().map(f64::to_string));
            writer.write_record(&record)?;
        }
        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

/// Writes summary snapshots next to each other in one directory.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
    stem: String,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
        }
    }

    /// `<stem> (<first>~<last> checkpoint).csv`, 1-based dataset indices
    pub fn checkpoint_path(&self, span: RowSpan) -> PathBuf {
        self.dir.join(format!("{} ({span} checkpoint).csv", self.stem))
    }

    /// `<stem> (<n> rows).csv`
    pub fn final_path(&self, rows: usize) -> PathBuf {
        self.dir.join(format!("{} ({rows} rows).csv", self.stem))
    }

    pub fn write_checkpoint(&self, table: &SummaryTable, span: RowSpan) -> Result<PathBuf, DatasetError> {
        let path = self.checkpoint_path(span);
        write_table(table, &path)?;
        Ok(path)
    }

    pub fn write_final(&self, table: &SummaryTable) -> Result<PathBuf, DatasetError> {
        let path = self.final_path(table.len());
        write_table(table, &path)?;
        Ok(path)
    }
}

fn write_table(table: &SummaryTable, path: &Path) -> Result<(), DatasetError> {
    let bytes = table.to_csv()?;
    write_atomic(path, &bytes).map_err(|source| DatasetError::Persistence {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn cols() -> Vec<String> {
        vec!["도서권수".to_string(), "대출건수".to_string()]
    }

    #[test]
    fn sums_required_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(
            &path,
            "번호,도서명,도서권수,대출건수\n1,가,2,10\n2,나,1,\n3,다,3,\"1,200\"\n",
        )
        .unwrap();
        assert_eq!(sum_columns(&path, &cols()).unwrap(), vec![6.0, 1210.0]);
    }

    #[test]
    fn header_bom_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "\u{feff}도서권수,대출건수\n1,2\n").unwrap();
        assert_eq!(sum_columns(&path, &cols()).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn missing_column_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "번호,도서권수\n1,2\n").unwrap();
        match sum_columns(&path, &cols()) {
            Err(RowError::Parse { message, .. }) => assert!(message.contains("대출건수")),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn absent_file_is_missing_not_parse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.csv");
        assert!(matches!(sum_columns(&path, &cols()), Err(RowError::Missing(_))));
    }

    #[test]
    fn non_numeric_cell_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "도서권수,대출건수\n1,many\n").unwrap();
        match sum_columns(&path, &cols()) {
            Err(RowError::Parse { message, .. }) => assert!(message.contains("line 2")),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn table_csv_layout() {
        let mut table = SummaryTable::new(cols());
        table.push(SummaryRow {
            library: "강남".to_string(),
            year: 2023,
            month: 4,
            sums: vec![6.0, 1210.5],
        });
        let text = String::from_utf8(table.to_csv().unwrap()).unwrap();
        assert_eq!(text, "LibraryName,Year,Month,도서권수,대출건수\n강남,2023,4,6,1210.5\n");
    }

    #[test]
    fn snapshot_names() {
        let writer = SnapshotWriter::new("/out", "stats");
        assert_eq!(
            writer.checkpoint_path(RowSpan { first: 0, last: 999 }),
            PathBuf::from("/out/stats (1~1000 checkpoint).csv")
        );
        assert_eq!(writer.final_path(42), PathBuf::from("/out/stats (42 rows).csv"));
    }
}
