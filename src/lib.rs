//! # grade_stats
//!
//! Reads the class grade sheet exported by the school management software
//! (`.xls` or `.xlsx`), rebuilds the per-student table from its fixed layout
//! and computes the class statistics of the end-of-term report.
//!
//! ```no_run
//! use grade_stats::spreadsheet::Criteria;
//! use std::path::Path;
//!
//! let analysis = grade_stats::analyze_file(Path::new("turma.xlsx"), &Criteria::default())?;
//! for (label, value) in analysis.statistics.entries() {
//!     println!("{label}: {value}");
//! }
//! # Ok::<(), grade_stats::error::GradeStatsError>(())
//! ```
pub mod error;
pub mod grades;
mod helpers;
pub mod logger;
pub mod report;
pub mod spreadsheet;
pub mod statistics;

use crate::error::GradeStatsError;
use crate::grades::CoercionWarning;
use crate::grades::StructuredTable;
use crate::spreadsheet::Criteria;
use crate::spreadsheet::Grid;
use crate::statistics::StatisticsReport;
use std::path::Path;

/// Everything produced from one sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub table: StructuredTable,
    pub statistics: StatisticsReport,
    pub warnings: Vec<CoercionWarning>,
}

impl Analysis {
    pub fn from_grid(grid: &Grid) -> Result<Analysis, GradeStatsError> {
        let extraction = grades::extract_with_warnings(grid)?;
        let statistics = statistics::compute(&extraction.table);
        Ok(Analysis {
            table: extraction.table,
            statistics,
            warnings: extraction.warnings,
        })
    }
}

pub fn analyze_file(path: &Path, criteria: &Criteria) -> Result<Analysis, GradeStatsError> {
    let grid = spreadsheet::read_grid(path, criteria)?;
    Analysis::from_grid(&grid)
}

/// Same as [`analyze_file`] for a file already held in memory (an upload).
pub fn analyze_bytes(file_name: &str, bytes: Vec<u8>, criteria: &Criteria) -> Result<Analysis, GradeStatsError> {
    let grid = spreadsheet::read_grid_from_bytes(file_name, bytes, criteria)?;
    Analysis::from_grid(&grid)
}
