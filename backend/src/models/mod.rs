//! Domain models for the conversion pipeline.
//!
//! - [`Cell`] - A typed spreadsheet value, copied through untouched
//! - [`Column`] - A named column of cells
//! - [`Table`] - Ordered columns, used for both source and output tables
//! - [`Resolution`] / [`MatchMethod`] - Outcome of matching one target column
//! - [`OutputGroup`] / [`OutputUnit`] - Split rows and their serialized form

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Cell
// =============================================================================

/// A single spreadsheet value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Excel serial date (days since 1899-12-30, fractional part is time).
    DateTime(f64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Int(i) => write!(f, "{}", i),
            // f64 Display drops the ".0" of integral values
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Cell::DateTime(serial) => match serial_to_datetime(*serial) {
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
                None => write!(f, "{}", serial),
            },
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_str(""),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Int(i) => serializer.serialize_i64(*i),
            Cell::Float(v) => serializer.serialize_f64(*v),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::DateTime(_) => serializer.collect_str(self),
        }
    }
}

/// Convert an Excel serial number to a calendar date-time (1900 date system).
fn serial_to_datetime(serial: f64) -> Option<chrono::NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

// =============================================================================
// Table
// =============================================================================

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self { name: name.into(), cells }
    }
}

/// Ordered columns of equal length.
///
/// Column order is significant: it drives first-match resolution and the
/// output layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// An empty table with a fixed number of rows, ready for [`Table::push_column`].
    pub fn with_rows(row_count: usize) -> Self {
        Self { columns: Vec::new(), row_count }
    }

    /// Build a table from a header row and data rows. Short rows are padded
    /// with [`Cell::Empty`], surplus cells are dropped.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let row_count = rows.len();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(row_count)))
            .collect();

        for row in rows {
            let mut values = row.into_iter();
            for column in columns.iter_mut() {
                column.cells.push(values.next().unwrap_or_default());
            }
        }

        Self { columns, row_count }
    }

    /// Append a column. Its length must equal the table's row count.
    pub fn push_column(&mut self, column: Column) {
        debug_assert_eq!(column.cells.len(), self.row_count, "column '{}' has wrong length", column.name);
        self.columns.push(column);
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names, in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Iterate over all rows.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Cell>> + '_ {
        (0..self.row_count).map(move |i| self.columns.iter().map(|c| &c.cells[i]).collect())
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// How a target column was matched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "score", rename_all = "camelCase")]
pub enum MatchMethod {
    /// An alias was found inside the source column name.
    Alias,
    /// The target name itself was found inside the source column name.
    Substring,
    /// Best similarity ratio, at or above the floor.
    Similarity(f64),
}

/// Outcome of matching one target column against the source columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Resolution {
    Resolved { column: String, method: MatchMethod },
    Unresolved,
}

impl Resolution {
    /// The matched source column, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { column, .. } => Some(column),
            Resolution::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

/// Target column → resolution, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMapping {
    pub entries: Vec<(String, Resolution)>,
}

impl ResolvedMapping {
    pub fn get(&self, field: &str) -> Option<&Resolution> {
        self.entries.iter().find(|(f, _)| f == field).map(|(_, r)| r)
    }

    /// Source column for `field`, `None` when unresolved or unknown.
    pub fn source_for(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Resolution::column)
    }

    pub fn resolved_count(&self) -> usize {
        self.entries.iter().filter(|(_, r)| r.is_resolved()).count()
    }
}

// =============================================================================
// Groups and Units
// =============================================================================

/// Output rows sharing one product name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputGroup {
    /// Raw product name, string form
    pub key: String,
    /// Row indices into the output table, ascending
    pub rows: Vec<usize>,
}

/// One serialized spreadsheet, destined for one archive entry.
#[derive(Debug, Clone)]
pub struct OutputUnit {
    /// Archive entry name, including extension
    pub name: String,
    pub rows: usize,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                vec![Cell::text("x"), Cell::Int(1)],
                vec![Cell::text("y")],
            ],
        )
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let table = sample();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("b").unwrap().cells, vec![Cell::Int(1), Cell::Empty]);
    }

    #[test]
    fn test_missing_column_is_none() {
        assert!(sample().column("zzz").is_none());
    }

    #[test]
    fn test_rows_iterate_in_order() {
        let table = sample();
        let rows: Vec<Vec<&Cell>> = table.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![&Cell::text("x"), &Cell::Int(1)]);
        assert_eq!(rows[1], vec![&Cell::text("y"), &Cell::Empty]);
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Float(3.0).to_string(), "3");
        assert_eq!(Cell::Float(2.5).to_string(), "2.5");
        assert_eq!(Cell::Int(-7).to_string(), "-7");
        assert_eq!(Cell::Empty.to_string(), "");
        assert_eq!(Cell::DateTime(45292.5).to_string(), "2024-01-01 12:00:00");
    }

    #[test]
    fn test_resolution_serialization() {
        let r = Resolution::Resolved { column: "수취인".into(), method: MatchMethod::Alias };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "resolved");
        assert_eq!(json["column"], "수취인");
        assert_eq!(json["method"]["type"], "alias");
    }
}
