use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

static EMPTY: CellValue = CellValue::Empty;

/// A scalar read from one spreadsheet cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    /// Text value, with the empty string mapped to [`CellValue::Empty`].
    pub fn text(value: &str) -> CellValue {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_owned())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    /// Integral numbers print without a fraction: `7`, not `7.0`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(number) => write!(f, "{number}"),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// Headerless cell grid of one worksheet, anchored at A1. Only populated
/// cells are stored; everything else inside the bounds reads as empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid {
    cells: BTreeMap<(usize, usize), CellValue>,
    height: usize,
    width: usize,
}

impl Grid {
    /// Builds a grid from dense rows; the width is that of the longest row.
    pub fn new(rows: Vec<Vec<CellValue>>) -> Grid {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut grid = Grid::with_size(rows.len(), width);
        for (row, values) in rows.into_iter().enumerate() {
            for (col, value) in values.into_iter().enumerate() {
                grid.set(row, col, value);
            }
        }
        grid
    }

    pub(crate) fn with_size(height: usize, width: usize) -> Grid {
        Grid { cells: BTreeMap::new(), height, width }
    }

    /// Stores a value; empty values clear the cell.
    pub(crate) fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Cell at (row, col), empty when unset or outside the grid.
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.cells.get(&(row, col)).unwrap_or(&EMPTY)
    }
}
