use crate::grades::column_map::build_column_map;
use crate::grades::column_map::ColumnMap;
use crate::grades::grade::classify;
use crate::grades::grade::GradeValue;
use crate::grades::layout::SheetLayout;
use crate::grades::table::StructuredTable;
use crate::grades::table::StudentRecord;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::CellValue;
use crate::spreadsheet::Grid;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// The sheet does not have the shape of a class export.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Header row {row} ({description}) is missing: the sheet has {height} rows")]
    MissingHeaderRow {
        row: usize,
        description: &'static str,
        height: usize,
    },

    #[error("Column {column} ({description}) is missing: the sheet has {width} columns")]
    MissingColumn {
        column: usize,
        description: &'static str,
        width: usize,
    },
}

/// A grade cell that was neither a mention nor a number. The grade itself is
/// recorded as missing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CoercionWarning {
    /// Cell reference such as `F15`
    pub reference: String,
    pub subject: String,
    pub raw: String,
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): '{}' is not a grade", self.reference, self.subject, self.raw)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub table: StructuredTable,
    pub warnings: Vec<CoercionWarning>,
}

/// Rebuilds the student table from a raw class sheet.
#[derive(Clone, Copy, Debug, Default)]
pub struct GradeExtractor {
    layout: SheetLayout,
}

impl GradeExtractor {
    pub fn new(layout: SheetLayout) -> GradeExtractor {
        GradeExtractor { layout }
    }

    pub fn extract(&self, grid: &Grid) -> Result<StructuredTable, SchemaError> {
        self.extract_with_warnings(grid).map(|extraction| extraction.table)
    }

    pub fn extract_with_warnings(&self, grid: &Grid) -> Result<Extraction, SchemaError> {
        self.validate(grid)?;
        let column_map = build_column_map(grid, &self.layout);
        let mut warnings = Vec::new();
        let mut students = Vec::new();

        for row in self.layout.data_start_row..grid.height() {
            let id = grid.get(row, self.layout.id_col);
            let name = grid.get(row, self.layout.name_col);
            if self.is_end_of_list(id, name) {
                debug!(row, "end of student list");
                break;
            }
            students.push(StudentRecord {
                id: id.clone(),
                name: name.to_string(),
                grades: self.read_grades(grid, row, &column_map, &mut warnings),
            });
        }

        let subjects = column_map.subjects().map(str::to_owned).collect();
        info!(students = students.len(), subjects = column_map.len(), warnings = warnings.len(), "grades extracted");
        Ok(Extraction {
            table: StructuredTable::new(subjects, students),
            warnings,
        })
    }

    fn validate(&self, grid: &Grid) -> Result<(), SchemaError> {
        for (row, description) in [
            (self.layout.subject_row, "subjects"),
            (self.layout.flag_row, "final grade flags"),
        ] {
            if grid.height() <= row {
                Err(SchemaError::MissingHeaderRow { row, description, height: grid.height() })?
            }
        }
        if grid.height() > self.layout.data_start_row {
            for (column, description) in [
                (self.layout.id_col, "student number"),
                (self.layout.name_col, "student name"),
            ] {
                if grid.width() <= column {
                    Err(SchemaError::MissingColumn { column, description, width: grid.width() })?
                }
            }
        }
        Ok(())
    }

    /// The list ends at a blank identifier, or at a non-numeric identifier
    /// without a name (a footer such as "Média").
    ///
    /// Error cells read as their literal text, so an identifier showing
    /// `#N/A` next to a name is still a student row. Only a `#N/A` without a
    /// name ends the list, through the footer rule.
    fn is_end_of_list(&self, id: &CellValue, name: &CellValue) -> bool {
        match id {
            CellValue::Empty => true,
            CellValue::Text(text) => !is_all_digits(text) && name.is_empty(),
            _ => false,
        }
    }

    fn read_grades(&self, grid: &Grid, row: usize, column_map: &ColumnMap, warnings: &mut Vec<CoercionWarning>) -> Vec<Option<f64>> {
        column_map
            .iter()
            .map(|(subject, col)| {
                let cell = grid.get(row, col);
                let grade = classify(cell);
                if grade == GradeValue::Unreadable {
                    let warning = CoercionWarning {
                        reference: index_to_reference(row, col),
                        subject: subject.to_owned(),
                        raw: cell.to_string(),
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                }
                grade.score()
            })
            .collect()
    }
}

fn is_all_digits(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

/// Extracts with the standard layout.
pub fn extract(grid: &Grid) -> Result<StructuredTable, SchemaError> {
    GradeExtractor::default().extract(grid)
}

/// Extracts with the standard layout, keeping the coercion warnings.
pub fn extract_with_warnings(grid: &Grid) -> Result<Extraction, SchemaError> {
    GradeExtractor::default().extract_with_warnings(grid)
}
