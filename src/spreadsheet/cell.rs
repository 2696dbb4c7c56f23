use crate::error::GradeStatsError;
use crate::spreadsheet::grid::CellValue;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;

/// How the raw text of a decoded cell must be interpreted.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// "1" or "0"
    Boolean,
    /// Decimal text of a double, including date serial numbers
    Number,
    /// ISO 8601 date/time text (xlsx `t="d"`)
    IsoDateTime,
    /// Text stored inline in the cell record
    InlineString,
    /// Index into the shared string table
    SharedString,
    /// Error literal such as `#N/A`
    Error,
}

/// Converts BIFF error codes to their spreadsheet literal.
pub(crate) fn to_error_value(value: u8) -> &'static str {
    match value {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        _ => "#ERROR!",
    }
}

/// A decoded cell before shared strings are resolved.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    pub(crate) value: String,
}

impl Cell {
    /// Excel-style reference of the cell (e.g. "C14").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Resolves the raw text into a typed grid value.
    pub(crate) fn to_value(&self, shared_strings: &[String]) -> Result<CellValue, GradeStatsError> {
        let value = match self.kind {
            CellType::Empty => CellValue::Empty,
            CellType::Boolean => CellValue::Bool(self.value == "1" || self.value.eq_ignore_ascii_case("true")),
            CellType::Number => CellValue::Number(self.to_double()?),
            CellType::IsoDateTime | CellType::InlineString | CellType::Error => CellValue::text(&self.value),
            CellType::SharedString => {
                let index = self.value.parse::<usize>()?;
                let text = shared_strings.get(index).ok_or_else(|| SpreadsheetError::CellValueError(
                    String::new(),
                    String::new(),
                    self.reference(),
                    format!("shared string #{index} does not exist"),
                ))?;
                CellValue::text(text)
            }
        };
        Ok(value)
    }

    fn to_double(&self) -> Result<f64, GradeStatsError> {
        self.value.trim().parse::<f64>().map_err(|_| {
            SpreadsheetError::CellValueError(
                String::new(),
                String::new(),
                self.reference(),
                format!("parse '{}' to double failed", self.value),
            )
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell { row: 13, col: 2, kind, value: value.to_owned() }
    }

    #[test]
    fn resolves_values() {
        let shared = vec!["Bom".to_owned(), "".to_owned()];
        assert_eq!(cell(CellType::Number, "4").to_value(&shared).unwrap(), CellValue::Number(4.0));
        assert_eq!(cell(CellType::Boolean, "1").to_value(&shared).unwrap(), CellValue::Bool(true));
        assert_eq!(cell(CellType::SharedString, "0").to_value(&shared).unwrap(), CellValue::Text("Bom".to_owned()));
        assert_eq!(cell(CellType::SharedString, "1").to_value(&shared).unwrap(), CellValue::Empty);
        assert_eq!(cell(CellType::Error, "#N/A").to_value(&shared).unwrap(), CellValue::Text("#N/A".to_owned()));
    }

    #[test]
    fn dangling_shared_string_names_the_cell() {
        let error = cell(CellType::SharedString, "7").to_value(&[]).unwrap_err();
        assert!(error.to_string().contains("C14"), "{error}");
    }

    #[test]
    fn error_literals() {
        assert_eq!(to_error_value(0x07), "#DIV/0!");
        assert_eq!(to_error_value(0x2A), "#N/A");
        assert_eq!(to_error_value(0xFF), "#ERROR!");
    }
}
