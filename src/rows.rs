//! Row sources and the pre-scan that decides how many rows a run covers.
//!
//! Row 0 of every source is a header and is never read as data.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use tracing::debug;

use crate::error::BatchError;

/// Read-only view of the text column of a table.
pub trait RowSource {
    /// Number of rows, header included.
    fn row_count(&self) -> usize;

    /// Text of the 0-based row `index`; empty when out of range.
    fn text_at(&self, index: usize) -> String;
}

/// Vector-backed rows.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryRows {
    rows: Vec<String>,
}

#[cfg(test)]
impl MemoryRows {
    pub fn new<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
impl RowSource for MemoryRows {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn text_at(&self, index: usize) -> String {
        self.rows.get(index).cloned().unwrap_or_default()
    }
}

/// One column of the first worksheet of a workbook.
pub struct SpreadsheetRows {
    range: Range<Data>,
    column: u32,
}

impl SpreadsheetRows {
    /// Open `path` (xlsx, xls, xlsb or ods) and read from `column` (0-based).
    pub fn open(path: &Path, column: u32) -> Result<Self, BatchError> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| BatchError::Config(format!("{} has no worksheets", path.display())))??;
        debug!(path = %path.display(), column, end = ?range.end(), "opened workbook");
        Ok(Self { range, column })
    }
}

impl RowSource for SpreadsheetRows {
    fn row_count(&self) -> usize {
        self.range
            .end()
            .map(|(row, _)| row as usize + 1)
            .unwrap_or(0)
    }

    fn text_at(&self, index: usize) -> String {
        let Ok(row) = u32::try_from(index) else {
            return String::new();
        };
        self.range
            .get_value((row, self.column))
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

/// Parse a column reference: letters (`A`, `c`, `AA`) or a 0-based number.
pub fn column_index(column: &str) -> Result<u32, String> {
    let column = column.trim();
    if column.is_empty() {
        return Err("column must not be empty".into());
    }
    if let Ok(index) = column.parse::<u32>() {
        return Ok(index);
    }
    if !column.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(format!("invalid column `{column}`: use letters like C or a 0-based number"));
    }
    let mut index: u32 = 0;
    for c in column.chars() {
        let digit = u32::from(c.to_ascii_uppercase() as u8 - b'A') + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .ok_or_else(|| format!("column `{column}` is out of range"))?;
    }
    Ok(index - 1)
}

fn is_blank(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

/// Collect data rows from row 1 up to (not including) the first blank or
/// `nan` row. Anything after that row is ignored.
pub fn prescan(source: &impl RowSource) -> Result<Vec<String>, BatchError> {
    let mut rows = Vec::new();
    for index in 1..source.row_count() {
        let text = source.text_at(index);
        if is_blank(&text) {
            break;
        }
        rows.push(text);
    }

    if rows.is_empty() {
        return Err(BatchError::EmptyDataset);
    }
    debug!(total_rows = rows.len(), "pre-scan finished");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prescan_stops_at_first_empty_row() {
        let source = MemoryRows::new(["header", "a", "b", "", "c"]);
        assert_eq!(prescan(&source).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn prescan_treats_nan_and_whitespace_as_blank() {
        let source = MemoryRows::new(["header", "one", "NaN", "two"]);
        assert_eq!(prescan(&source).unwrap(), vec!["one"]);

        let source = MemoryRows::new(["header", "one", "   ", "two"]);
        assert_eq!(prescan(&source).unwrap(), vec!["one"]);
    }

    #[test]
    fn prescan_keeps_text_as_read() {
        let source = MemoryRows::new(["header", "  padded text "]);
        assert_eq!(prescan(&source).unwrap(), vec!["  padded text "]);
    }

    #[test]
    fn prescan_reads_every_row_without_blank() {
        let source = MemoryRows::new(["header", "a", "b", "c"]);
        assert_eq!(prescan(&source).unwrap().len(), 3);
    }

    #[test]
    fn header_only_is_an_empty_dataset() {
        let err = prescan(&MemoryRows::new(["header"])).unwrap_err();
        assert!(matches!(err, BatchError::EmptyDataset));

        let err = prescan(&MemoryRows::new(["header", ""])).unwrap_err();
        assert!(matches!(err, BatchError::EmptyDataset));

        let err = prescan(&MemoryRows::default()).unwrap_err();
        assert!(matches!(err, BatchError::EmptyDataset));
    }

    #[test]
    fn memory_rows_out_of_range_is_empty() {
        let source = MemoryRows::new(["header"]);
        assert_eq!(source.text_at(7), "");
    }

    #[test]
    fn column_letters_map_to_indices() {
        assert_eq!(column_index("A").unwrap(), 0);
        assert_eq!(column_index("c").unwrap(), 2);
        assert_eq!(column_index("Z").unwrap(), 25);
        assert_eq!(column_index("AA").unwrap(), 26);
        assert_eq!(column_index("AB").unwrap(), 27);
        assert_eq!(column_index("4").unwrap(), 4);
    }

    #[test]
    fn column_rejects_junk() {
        assert!(column_index("").is_err());
        assert!(column_index("C3").is_err());
        assert!(column_index("ZZZZZZZZ").is_err());
    }

    #[test]
    fn opening_missing_workbook_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = SpreadsheetRows::open(&dir.path().join("missing.xlsx"), 2);
        assert!(result.is_err());
    }
}
