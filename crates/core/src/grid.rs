//! Spreadsheet-agnostic cell values, column letters, and 1-indexed grid access.
//!
//! Everything the segmenter and the failure matcher read goes through the
//! [`Grid`] trait, so the same code runs against a raw extracted table and
//! against a workbook sheet.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Excel's last column (`XFD`).
pub const MAX_COLUMN: u16 = 16_384;

/// Excel's last row.
pub const MAX_ROW: u32 = 1_048_576;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel serial date in the 1900 date system.
    DateTime(f64),
    /// Formula source, including the leading `=`.
    Formula(String),
}

impl CellValue {
    /// `true` for [`CellValue::Empty`] and for empty text.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for marker and header matching.
    ///
    /// Whole numbers render without a fractional part so `3.0` reads as `3`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) | CellValue::DateTime(n) => Some(format_number(*n)),
            CellValue::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            CellValue::Formula(f) => Some(f.clone()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(s) if !s.is_empty() => CellValue::Text(s),
            _ => CellValue::Empty,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ---------------------------------------------------------------------------
// Columns and cell references
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid column reference: {0:?}")]
pub struct InvalidColumn(pub String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid cell reference: {0:?}")]
pub struct InvalidCellRef(pub String);

/// A 1-indexed spreadsheet column (`A` = 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Column(u16);

impl Column {
    pub const A: Column = Column(1);
    pub const B: Column = Column(2);
    pub const D: Column = Column(4);
    pub const H: Column = Column(8);

    pub fn new(index: u16) -> Result<Self, InvalidColumn> {
        if (1..=MAX_COLUMN).contains(&index) {
            Ok(Column(index))
        } else {
            Err(InvalidColumn(index.to_string()))
        }
    }

    /// Parse column letters such as `"D"` or `"AJ"` (case-insensitive, `$` allowed).
    pub fn parse(letters: &str) -> Result<Self, InvalidColumn> {
        let trimmed = letters.trim().trim_start_matches('$');
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(InvalidColumn(letters.to_string()));
        }

        let mut index: u32 = 0;
        for c in trimmed.chars() {
            index = index * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if index > MAX_COLUMN as u32 {
                return Err(InvalidColumn(letters.to_string()));
            }
        }

        Ok(Column(index as u16))
    }

    /// 1-based index.
    pub fn index(&self) -> u16 {
        self.0
    }

    pub fn letters(&self) -> String {
        let mut n = self.0 as u32;
        let mut out = Vec::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            out.push((b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        out.iter().rev().collect()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letters())
    }
}

impl FromStr for Column {
    type Err = InvalidColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::parse(s)
    }
}

impl TryFrom<String> for Column {
    type Error = InvalidColumn;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Column::parse(&value)
    }
}

impl From<Column> for String {
    fn from(value: Column) -> Self {
        value.letters()
    }
}

/// A 1-indexed cell address such as `B10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub column: Column,
}

impl CellRef {
    pub fn new(row: u32, column: Column) -> Self {
        CellRef { row, column }
    }

    pub fn parse(s: &str) -> Result<Self, InvalidCellRef> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| InvalidCellRef(s.to_string()))?;
        let (letters, digits) = cleaned.split_at(split);
        let column = Column::parse(letters).map_err(|_| InvalidCellRef(s.to_string()))?;
        let row: u32 = digits.parse().map_err(|_| InvalidCellRef(s.to_string()))?;
        if row == 0 || row > MAX_ROW {
            return Err(InvalidCellRef(s.to_string()));
        }
        Ok(CellRef { row, column })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

/// An inclusive rectangular range such as `A10:AJ5008`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    pub first: CellRef,
    pub last: CellRef,
}

impl CellRange {
    pub fn new(first_column: Column, first_row: u32, last_column: Column, last_row: u32) -> Self {
        CellRange {
            first: CellRef::new(first_row, first_column),
            last: CellRef::new(last_row, last_column),
        }
    }

    /// A range covering a single column.
    pub fn column(column: Column, first_row: u32, last_row: u32) -> Self {
        CellRange::new(column, first_row, column, last_row)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first, self.last)
    }
}

// ---------------------------------------------------------------------------
// Grid trait
// ---------------------------------------------------------------------------

/// Read access to a table of cells by 1-indexed `(row, column)` coordinate.
pub trait Grid {
    /// Last row holding a value (0 for an empty grid).
    fn max_row(&self) -> u32;

    /// Last column holding a value (0 for an empty grid).
    fn max_column(&self) -> u16;

    fn value(&self, row: u32, column: u16) -> Option<&CellValue>;

    /// Text of every non-empty cell in the row, left to right.
    fn row_texts(&self, row: u32) -> Vec<String> {
        (1..=self.max_column())
            .filter_map(|c| self.value(row, c))
            .filter(|v| !v.is_empty())
            .filter_map(CellValue::as_text)
            .collect()
    }
}

impl Grid for [Vec<CellValue>] {
    fn max_row(&self) -> u32 {
        self.len() as u32
    }

    fn max_column(&self) -> u16 {
        let widest = self.iter().map(|r| r.len()).max().unwrap_or(0);
        u16::try_from(widest).unwrap_or(u16::MAX)
    }

    fn value(&self, row: u32, column: u16) -> Option<&CellValue> {
        if row == 0 || column == 0 {
            return None;
        }
        self.get(row as usize - 1)
            .and_then(|r| r.get(column as usize - 1))
    }
}
