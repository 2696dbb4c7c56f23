use crate::error::{GradeStatsError, ResultMessage};
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::grid::Grid;
use crate::spreadsheet::reference::SheetLimits;
use crate::spreadsheet::SpreadsheetError;

/// Cells decoded from one worksheet, in the order the reader met them.
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// All non-empty cells in the sheet
    pub(crate) cells: Vec<Cell>,
    /// Actual data range (determined from cell data)
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
    /// Capacity of the container format
    limits: SheetLimits,
}

impl Sheet {
    pub(super) fn new(file_name: &str, name: &str, limits: SheetLimits) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            row_upper_bound: None,
            col_upper_bound: None,
            limits,
        }
    }

    /// Returns true if the sheet contains no cells.
    pub(super) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell to the sheet, updating the data range. Cells past the
    /// format's last row or column are rejected.
    pub(super) fn push(&mut self, cell: Cell) -> Result<(), GradeStatsError> {
        if !self.limits.contains(cell.row, cell.col) {
            Err(SpreadsheetError::CellOutOfRangeError(
                self.file_name.to_owned(),
                self.name.to_owned(),
                cell.row.saturating_add(1),
                cell.col.saturating_add(1),
            ))?
        }
        self.update_bound(cell.row, cell.col);
        self.cells.push(cell);
        Ok(())
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_upper_bound.map(|row_upper_bound| row_upper_bound < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_upper_bound.map(|col_upper_bound| col_upper_bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Lays the cells out on a grid anchored at A1, resolving shared strings.
    /// A cell written twice keeps its last value.
    pub(super) fn into_grid(self, shared_strings: &[String]) -> Result<Grid, GradeStatsError> {
        let height = self.row_upper_bound.map(|row| row + 1).unwrap_or(0);
        let width = self.col_upper_bound.map(|col| col + 1).unwrap_or(0);
        let mut grid = Grid::with_size(height, width);
        for cell in &self.cells {
            let value = cell.to_value(shared_strings)
                .with_prefix(&format!("'{}' sheet '{}'", self.file_name, self.name))?;
            grid.set(cell.row, cell.col, value);
        }
        Ok(grid)
    }
}
