use crate::error::GradeStatsError;
use crate::error::ResultOptionChain;
use crate::helpers::biff8::Biff8Reader;
use crate::helpers::cfb::Cfb;
use crate::helpers::reader::SourceReader;
use crate::match_biff8_record;
use crate::spreadsheet::cell::to_error_value;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::XLS_LIMITS;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use thiserror::Error;
use tracing::debug;

// BIFF8 record types
const FORMULA: u16 = 6;
const EOF: u16 = 10;
const FILE_PASS: u16 = 47;
const BOUND_SHEET8: u16 = 133;
const MUL_RK: u16 = 189;
const SST: u16 = 252;
const LABEL_SST: u16 = 253;
const NUMBER: u16 = 515;
const LABEL: u16 = 516;
const BOOL_ERR: u16 = 517;
const STRING: u16 = 519;
const ARRAY: u16 = 545;
const TABLE: u16 = 566;
const RK: u16 = 638;
const SHR_FMLA: u16 = 1212;
const BOF: u16 = 2057;

const BIFF8_VERSION: u16 = 0x0600;
const WORKSHEET: u8 = 0;

#[derive(Error, Debug)]
pub enum XlsError {
    #[error("Workbook stream does not start with a BOF record")]
    MissingBofError,

    #[error("Unsupported BIFF version 0x{0:04X} (only Excel 97-2003 files are supported)")]
    UnsupportedVersionError(u16),

    #[error("Invalid Formula value '{0}'")]
    FormulaValueError(u64),
}

/// Excel 97-2003 workbook (`.xls`)
pub(crate) struct XlsSpreadsheet {
    pub(crate) name: String,
    reader: Biff8Reader,
    shared_strings: Vec<String>,
    /// Worksheets with the stream offset of their BOF record
    sheets: Vec<(String, usize)>,
}

impl XlsSpreadsheet {
    pub(crate) fn open(file_name: &str, mut source: SourceReader) -> Result<XlsSpreadsheet, GradeStatsError> {
        let cfb = Cfb::new(&mut source)?;
        let stream = cfb.read("Workbook")
            .ok_none_else(|| cfb.read("Book"))?
            .ok_or_else(|| SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?;
        Self::from_stream(file_name, stream)
    }

    /// Reads the workbook globals substream: shared strings and worksheet offsets.
    fn from_stream(file_name: &str, stream: Vec<u8>) -> Result<XlsSpreadsheet, GradeStatsError> {
        let mut reader = Biff8Reader::new(stream);
        match reader.next()? {
            Some(BOF) => {
                let version = reader.read_u16()?;
                if version != BIFF8_VERSION {
                    Err(XlsError::UnsupportedVersionError(version))?
                }
            }
            _ => Err(XlsError::MissingBofError)?,
        }

        let mut shared_strings = Vec::new();
        let mut sheets: Vec<(String, usize)> = Vec::new();
        match_biff8_record!(reader => {
            EOF => break,
            FILE_PASS => Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?,
            SST => shared_strings = load_shared_strings(&mut reader)?,
            BOUND_SHEET8 => {
                let pointer = reader.read_usize()?;
                reader.skip(1)?;
                let sheet_type = reader.read_u8()?;
                let sheet_name = reader.read_short_xl_unicode_string()?;
                if sheet_type == WORKSHEET {
                    sheets.push((sheet_name, pointer));
                } else {
                    debug!(sheet = %sheet_name, sheet_type, "skipping non-worksheet");
                }
            }
        });
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
        }
        debug!(file = file_name, sheets = sheets.len(), shared_strings = shared_strings.len(), "workbook globals read");

        Ok(XlsSpreadsheet {
            name: file_name.to_owned(),
            reader,
            shared_strings,
            sheets,
        })
    }
}

impl Spreadsheet for XlsSpreadsheet {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// The shared string table was read with the workbook globals.
    fn load_shared_strings(&mut self) -> Result<Vec<String>, GradeStatsError> {
        Ok(self.shared_strings.to_owned())
    }

    fn read_sheet(&mut self, sheet_name: &str, criteria: &Criteria) -> Result<Sheet, GradeStatsError> {
        let pointer = self.sheets.iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, pointer)| *pointer)
            .ok_or_else(|| SpreadsheetError::SheetNotFound(self.name.to_owned(), sheet_name.to_owned()))?;

        self.reader.goto(pointer);
        self.reader.next()?;
        let mut sheet = Sheet::new(&self.name, sheet_name, XLS_LIMITS);
        while let Some(tag) = self.reader.next()? {
            match tag {
                BOF | EOF => break,
                MUL_RK => {
                    let row = self.reader.read_u16()? as usize;
                    let col_lower_bound = self.reader.read_u16()? as usize;
                    let col_upper_bound = self.reader.get_u16_back(2)? as usize;
                    for col in col_lower_bound..=col_upper_bound {
                        self.reader.skip(2)?;
                        let value = self.reader.read_rk_number()?;
                        sheet.push(Cell {
                            row,
                            col,
                            kind: CellType::Number,
                            value: value.to_string(),
                        })?;
                    }
                }
                BOOL_ERR | NUMBER | RK | LABEL_SST | LABEL | FORMULA => {
                    let row = self.reader.read_u16()? as usize;
                    let col = self.reader.read_u16()? as usize;
                    let (kind, value) = match tag {
                        BOOL_ERR => read_bool_or_error_cell(&mut self.reader)?,
                        NUMBER => read_number_cell(&mut self.reader)?,
                        RK => read_rk_cell(&mut self.reader)?,
                        LABEL_SST => read_label_sst_cell(&mut self.reader)?,
                        LABEL => read_label_cell(&mut self.reader)?,
                        _ => read_formula_cell(&mut self.reader)?,
                    };
                    if kind == CellType::Error && !criteria.error_as_text {
                        Err(SpreadsheetError::CellValueError(
                            sheet.file_name.to_owned(),
                            sheet.name.to_owned(),
                            index_to_reference(row, col),
                            value.to_owned(),
                        ))?
                    }
                    if !value.is_empty() {
                        sheet.push(Cell {
                            row,
                            col,
                            kind,
                            value,
                        })?;
                    }
                }
                _ => (),
            }
        }
        debug!(sheet = sheet_name, cells = sheet.cells.len(), "worksheet decoded");
        Ok(sheet)
    }
}

fn load_shared_strings(reader: &mut Biff8Reader) -> Result<Vec<String>, GradeStatsError> {
    let mut shared_strings: Vec<String> = Vec::new();
    reader.skip(4)?;
    let count = reader.read_usize()?;
    for _ in 0..count {
        let string = reader.read_xl_unicode_rich_extended_string()?;
        shared_strings.push(string);
    }
    Ok(shared_strings)
}

/// BOOLERR: a boolean when the flag byte is 0, an error code otherwise.
fn read_bool_or_error_cell(reader: &mut Biff8Reader) -> Result<(CellType, String), GradeStatsError> {
    reader.skip(2)?;
    let value = reader.read_u8()?;
    let flag = reader.read_u8()?;
    if flag == 0 {
        Ok((CellType::Boolean, value.to_string()))
    } else {
        Ok((CellType::Error, to_error_value(value).to_owned()))
    }
}

fn read_number_cell(reader: &mut Biff8Reader) -> Result<(CellType, String), GradeStatsError> {
    reader.skip(2)?;
    let value = reader.read_f64()?;
    Ok((CellType::Number, value.to_string()))
}

fn read_rk_cell(reader: &mut Biff8Reader) -> Result<(CellType, String), GradeStatsError> {
    reader.skip(2)?;
    let value = reader.read_rk_number()?;
    Ok((CellType::Number, value.to_string()))
}

fn read_label_sst_cell(reader: &mut Biff8Reader) -> Result<(CellType, String), GradeStatsError> {
    reader.skip(2)?;
    let value = reader.read_usize()?;
    Ok((CellType::SharedString, value.to_string()))
}

fn read_label_cell(reader: &mut Biff8Reader) -> Result<(CellType, String), GradeStatsError> {
    reader.skip(2)?;
    let value = reader.read_xl_unicode_string()?;
    Ok((CellType::InlineString, value))
}

/// FORMULA carries its cached result. A string result lives in the STRING
/// record that follows, possibly after a shared/array/table formula record.
fn read_formula_cell(reader: &mut Biff8Reader) -> Result<(CellType, String), GradeStatsError> {
    reader.skip(2)?;
    let formula = reader.read_u64()?;
    let is_number = (formula & 0xFFFF000000000000) != 0xFFFF000000000000;
    let flag = formula & 0xFF;
    if is_number {
        Ok((CellType::Number, f64::from_bits(formula).to_string()))
    } else if flag == 0 {
        while let Some(kind) = reader.next()? {
            match kind {
                STRING => return Ok((CellType::InlineString, reader.read_xl_unicode_string()?)),
                SHR_FMLA | ARRAY | TABLE => continue,
                _ => break,
            }
        }
        Err(XlsError::FormulaValueError(formula))?
    } else if flag == 1 {
        let value = if (formula & 0xFF0000) > 0 { "1" } else { "0" };
        Ok((CellType::Boolean, value.to_owned()))
    } else if flag == 2 {
        let code = ((formula >> 16) & 0xFF) as u8;
        Ok((CellType::Error, to_error_value(code).to_owned()))
    } else if flag == 3 {
        Ok((CellType::InlineString, "".to_owned()))
    } else {
        Err(XlsError::FormulaValueError(formula))?
    }
}
