use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{HerdbookError, Result};

/// A CSV file held as header-addressable string rows.
///
/// Headers are matched case-insensitively and fields are trimmed, so
/// `Father`, ` father ` and `FATHER` name the same column.
#[derive(Debug, Clone)]
pub struct CsvTable {
    columns: IndexMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Read a CSV file. The first row is treated as a header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, if the CSV is malformed,
    /// or if rows have inconsistent numbers of fields.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;
        Self::collect(reader)
    }

    /// Read CSV content from any reader, e.g. an in-memory byte slice.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(rdr);
        Self::collect(reader)
    }

    fn collect<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let columns: IndexMap<String, usize> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| (h.to_lowercase(), i))
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            if record.len() != columns.len() {
                return Err(HerdbookError::Data(format!(
                    "Row has {} fields but header has {} columns",
                    record.len(),
                    columns.len()
                )));
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { columns, rows })
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    /// Index of the first header matching any of `names`.
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.columns.get(*n).copied())
    }

    /// Like [`CsvTable::column`] but an absent column is an error.
    pub fn require_column(&self, names: &[&str]) -> Result<usize> {
        self.column(names).ok_or_else(|| {
            HerdbookError::Data(format!("CSV missing '{}' column", names.join("' / '")))
        })
    }

    /// Iterate over rows as field slices.
    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// Field `col` of `row`, or `None` when the column is absent or the cell empty.
pub fn field(row: &[String], col: Option<usize>) -> Option<&str> {
    col.and_then(|c| row.get(c))
        .map(String::as_str)
        .filter(|s| !s.is_empty())
}

/// Parse a parent reference, returning `None` for unknown parents.
///
/// Unknown parents are coded as `"0"`, `""`, `"NA"`, or `"na"`.
pub fn parse_parent(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "0" || trimmed.eq_ignore_ascii_case("na") {
        None
    } else {
        Some(trimmed.to_string())
    }
}
