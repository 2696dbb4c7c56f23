//! # Workbook reading
//!
//! Decodes Excel workbooks into the raw, headerless [`Grid`] of one worksheet:
//!
//! - `.xlsx`: Office Open XML zip package
//! - `.xls`: BIFF8 records inside an OLE compound file
//!
//! Number formats are not applied, so date cells read as their serial number.
pub(crate) mod cell;
mod criteria;
mod excel;
mod grid;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xls;
pub(crate) mod xlsx;

pub use criteria::Criteria;
pub use grid::CellValue;
pub use grid::Grid;

use crate::error::GradeStatsError;
use crate::error::ResultMessage;
use crate::helpers::reader::SourceReader;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xls::XlsSpreadsheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::ffi::OsStr;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use tracing::warn;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Cannot detect spreadsheet format of '{0}' (expected .xls or .xlsx)")]
    InvalidFileFormat(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Spreadsheet '{0}' has no worksheets")]
    SpreadsheetEmptyError(String),

    #[error("No worksheet of '{0}' matches '{1}'")]
    SheetNotFound(String, String),

    #[error("Missing part '{0}' in the workbook package")]
    FileError(String),

    #[error("Invalid cell value at {2}: {3}")]
    CellValueError(String, String, String, String),

    #[error("Invalid cell reference '{2}' in '{0}' sheet '{1}'")]
    CellReferenceError(String, String, String),

    #[error("Cell at row {2}, column {3} of '{0}' sheet '{1}' is outside the worksheet")]
    CellOutOfRangeError(String, String, usize, usize),
}

/// Container format, chosen by file extension.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Xls,
    Xlsx,
}

impl SpreadsheetFormat {
    pub fn detect(file_name: &str) -> Result<SpreadsheetFormat, SpreadsheetError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("xls") => Ok(SpreadsheetFormat::Xls),
            Some("xlsx") => Ok(SpreadsheetFormat::Xlsx),
            _ => Err(SpreadsheetError::InvalidFileFormat(file_name.to_owned())),
        }
    }
}

/// Format-independent access to a workbook.
pub(crate) trait Spreadsheet {
    fn name(&self) -> String;

    /// Worksheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    fn load_shared_strings(&mut self) -> Result<Vec<String>, GradeStatsError>;

    fn read_sheet(&mut self, sheet_name: &str, criteria: &Criteria) -> Result<Sheet, GradeStatsError>;
}

fn open_spreadsheet(file_name: &str, format: SpreadsheetFormat, source: SourceReader) -> Result<Box<dyn Spreadsheet>, GradeStatsError> {
    Ok(match format {
        SpreadsheetFormat::Xls => Box::new(XlsSpreadsheet::open(file_name, source)?),
        SpreadsheetFormat::Xlsx => Box::new(XlsxSpreadsheet::open(file_name, source)?),
    })
}

/// Reads the worksheet selected by `criteria` from a file on disk.
pub fn read_grid(path: &Path, criteria: &Criteria) -> Result<Grid, GradeStatsError> {
    let file_name = path.to_string_lossy();
    let format = SpreadsheetFormat::detect(&file_name)?;
    let source = SourceReader::open(path).with_prefix(&format!("Open '{file_name}' failed"))?;
    load_grid(&file_name, format, source, criteria)
}

/// Reads the worksheet selected by `criteria` from an uploaded buffer.
/// `file_name` only decides the format and names the source in errors.
pub fn read_grid_from_bytes(file_name: &str, bytes: Vec<u8>, criteria: &Criteria) -> Result<Grid, GradeStatsError> {
    let format = SpreadsheetFormat::detect(file_name)?;
    load_grid(file_name, format, SourceReader::from_bytes(bytes), criteria)
}

fn load_grid(file_name: &str, format: SpreadsheetFormat, source: SourceReader, criteria: &Criteria) -> Result<Grid, GradeStatsError> {
    let mut spreadsheet = open_spreadsheet(file_name, format, source)?;
    let sheet_names = spreadsheet.sheet_names();
    let sheet_name = criteria.select(&sheet_names)
        .ok_or_else(|| SpreadsheetError::SheetNotFound(
            spreadsheet.name(),
            criteria.sheet_name_pattern.as_ref().map(|pattern| pattern.to_string()).unwrap_or_default(),
        ))?;
    let shared_strings = spreadsheet.load_shared_strings()?;
    let sheet = spreadsheet.read_sheet(sheet_name, criteria)
        .with_prefix(&format!("'{file_name}' sheet '{sheet_name}'"))?;
    if sheet.is_empty() {
        warn!(file = file_name, sheet = sheet_name, "worksheet has no cells");
    }
    let grid = sheet.into_grid(&shared_strings)?;
    info!(file = file_name, sheet = sheet_name, rows = grid.height(), cols = grid.width(), "worksheet loaded");
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_by_extension() {
        assert_eq!(SpreadsheetFormat::detect("pauta.xls").unwrap(), SpreadsheetFormat::Xls);
        assert_eq!(SpreadsheetFormat::detect("dir/PAUTA.XLSX").unwrap(), SpreadsheetFormat::Xlsx);
        assert!(SpreadsheetFormat::detect("pauta.csv").is_err());
        assert!(SpreadsheetFormat::detect("pauta").is_err());
    }

    #[test]
    fn rejects_unknown_extension_before_reading() {
        let error = read_grid_from_bytes("notas.ods", Vec::new(), &Criteria::default()).unwrap_err();
        assert!(matches!(
            error,
            GradeStatsError::SpreadsheetError(SpreadsheetError::InvalidFileFormat(_))
        ));
    }

    #[test]
    fn missing_file() {
        let error = read_grid(Path::new("/nonexistent/pauta.xlsx"), &Criteria::default()).unwrap_err();
        assert!(error.to_string().starts_with("Open '/nonexistent/pauta.xlsx' failed"), "{error}");
    }
}
