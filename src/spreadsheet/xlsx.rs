use crate::error::GradeStatsError;
use crate::helpers::reader::SourceReader;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::reference::XLSX_LIMITS;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::io::BufRead;
use tracing::debug;
use zip::ZipArchive;

const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
const TAG_TEXT: QName = QName(b"t");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

/// Office Open XML workbook (`.xlsx`)
pub(crate) struct XlsxSpreadsheet {
    pub(crate) name: String,
    zip: ZipArchive<SourceReader>,
    /// Worksheets as (name, zip_path) pairs
    sheets: Vec<(String, String)>,
}

impl XlsxSpreadsheet {
    pub(crate) fn open(file_name: &str, source: SourceReader) -> Result<XlsxSpreadsheet, GradeStatsError> {
        let (zip, sheets) = excel::open(file_name, source, load_workbook)?;
        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip,
            sheets,
        })
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// Shared strings live in `xl/sharedStrings.xml`; the part is optional.
    fn load_shared_strings(&mut self) -> Result<Vec<String>, GradeStatsError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };

        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
                shared_strings.push(string);
            }
        });
        debug!(count = shared_strings.len(), "shared strings loaded");
        Ok(shared_strings)
    }

    fn read_sheet(&mut self, sheet_name: &str, criteria: &Criteria) -> Result<Sheet, GradeStatsError> {
        let zip_path = self.sheets.iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, path)| path.to_owned())
            .ok_or_else(|| SpreadsheetError::SheetNotFound(self.name.to_owned(), sheet_name.to_owned()))?;

        let mut sheet = Sheet::new(&self.name, sheet_name, XLSX_LIMITS);
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut reader = self.zip.xml_reader(&zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(r) = event.get_attribute_value("r")? {
                    row_count = r.parse::<usize>().ok()
                        .and_then(|index| index.checked_sub(1))
                        .filter(|index| *index < XLSX_LIMITS.rows)
                        .ok_or_else(|| SpreadsheetError::CellReferenceError(
                            sheet.file_name.to_owned(),
                            sheet.name.to_owned(),
                            r.to_string(),
                        ))?;
                }
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
                col_count = 0;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = match event.get_attribute_value("r")? {
                    Some(reference) => reference_to_index(&reference).ok_or_else(|| SpreadsheetError::CellReferenceError(
                        sheet.file_name.to_owned(),
                        sheet.name.to_owned(),
                        reference.to_string(),
                    ))?,
                    None => (row_count, col_count),
                };
                col_count = col + 1;
                kind = event.get_attribute_value("t")?.map(|t| {
                    match t.as_ref() {
                        "inlineStr" | "str" => CellType::InlineString,
                        "s" => CellType::SharedString,
                        "d" => CellType::IsoDateTime,
                        "b" => CellType::Boolean,
                        "e" => CellType::Error,
                        _ => CellType::Number,
                    }
                }).unwrap_or(CellType::Number);
                value.clear();
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if !value.is_empty() && event.name() == TAG_CELL => {
                if kind == CellType::Error && !criteria.error_as_text {
                    Err(SpreadsheetError::CellValueError(
                        sheet.file_name.to_owned(),
                        sheet.name.to_owned(),
                        index_to_reference(row, col),
                        value.to_owned(),
                    ))?
                }
                sheet.push(Cell {
                    row,
                    col,
                    kind,
                    value: std::mem::take(&mut value),
                })?;
            }
        });
        debug!(sheet = sheet_name, cells = sheet.cells.len(), "worksheet decoded");
        Ok(sheet)
    }
}

/// Lists worksheets from `xl/workbook.xml`, resolved through its relationships.
fn load_workbook(zip: &mut ZipArchive<SourceReader>) -> Result<Vec<(String, String)>, GradeStatsError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&*id) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
    });
    Ok(sheets)
}

/// Collects the text of a string element up to `end_tag`, skipping phonetic runs.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, GradeStatsError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::grid::CellValue;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Pauta" sheetId="1" r:id="rId1"/><sheet name="Resumo" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#;

    const RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;

    const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
<si><t>Muito Bom</t></si>
<si><r><t>PORT</t></r><r><t>.</t></r></si>
<si><t>Jo&amp;ana</t><rPh><t>ignored</t></rPh></si>
</sst>"#;

    const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="2"><c r="B2" t="s"><v>1</v></c><c r="D2"><v>3.5</v></c></row>
<row r="3"><c t="s"><v>0</v></c><c t="inlineStr"><is><t>CF</t></is></c><c t="b"><v>1</v></c><c t="e"><v>#N/A</v></c></row>
<row r="4"><c r="C4" t="s"><v>2</v></c><c r="E4"/></row>
</sheetData></worksheet>"#;

    const SHEET2: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="str"><f>1+1</f><v>dois</v></c></row>
</sheetData></worksheet>"#;

    fn package() -> Vec<u8> {
        package_with(SHEET2)
    }

    fn package_with(sheet2: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (path, content) in [
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/worksheets/sheet1.xml", SHEET1),
            ("xl/worksheets/sheet2.xml", sheet2),
        ] {
            writer.start_file(path, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn open() -> XlsxSpreadsheet {
        XlsxSpreadsheet::open("pauta.xlsx", SourceReader::from_bytes(package())).unwrap()
    }

    #[test]
    fn lists_worksheets_in_order() {
        assert_eq!(open().sheet_names(), vec!["Pauta".to_owned(), "Resumo".to_owned()]);
    }

    #[test]
    fn shared_strings_skip_phonetic_runs() {
        let shared_strings = open().load_shared_strings().unwrap();
        assert_eq!(shared_strings, vec!["Muito Bom".to_owned(), "PORT.".to_owned(), "Jo&ana".to_owned()]);
    }

    #[test]
    fn reads_cells() {
        let mut spreadsheet = open();
        let shared_strings = spreadsheet.load_shared_strings().unwrap();
        let sheet = spreadsheet.read_sheet("Pauta", &Criteria::default()).unwrap();
        let grid = sheet.into_grid(&shared_strings).unwrap();

        assert_eq!(grid.height(), 4);
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.get(1, 1), &CellValue::Text("PORT.".to_owned()));
        assert_eq!(grid.get(1, 3), &CellValue::Number(3.5));
        // positional fallback when cells carry no reference
        assert_eq!(grid.get(2, 0), &CellValue::Text("Muito Bom".to_owned()));
        assert_eq!(grid.get(2, 1), &CellValue::Text("CF".to_owned()));
        assert_eq!(grid.get(2, 2), &CellValue::Bool(true));
        assert_eq!(grid.get(2, 3), &CellValue::Text("#N/A".to_owned()));
        assert_eq!(grid.get(3, 2), &CellValue::Text("Jo&ana".to_owned()));
        assert_eq!(grid.get(3, 4), &CellValue::Empty);
    }

    #[test]
    fn formula_strings_use_cached_value() {
        let mut spreadsheet = open();
        let sheet = spreadsheet.read_sheet("Resumo", &Criteria::default()).unwrap();
        let grid = sheet.into_grid(&[]).unwrap();
        assert_eq!(grid.get(0, 0), &CellValue::Text("dois".to_owned()));
    }

    #[test]
    fn strict_mode_rejects_error_cells() {
        let criteria = Criteria { error_as_text: false, ..Criteria::default() };
        let error = open().read_sheet("Pauta", &criteria).err().unwrap().to_string();
        assert!(error.contains("D3"), "{error}");
        assert!(error.contains("#N/A"), "{error}");
    }

    #[test]
    fn unknown_sheet() {
        assert!(open().read_sheet("Outra", &Criteria::default()).is_err());
    }

    fn read_resumo(sheet_xml: &str) -> Result<Sheet, GradeStatsError> {
        let mut spreadsheet = XlsxSpreadsheet::open("pauta.xlsx", SourceReader::from_bytes(package_with(sheet_xml))).unwrap();
        spreadsheet.read_sheet("Resumo", &Criteria::default())
    }

    #[test]
    fn references_past_the_sheet_end_are_rejected() {
        let far_cell = r#"<worksheet><sheetData><row r="1"><c r="XFE1"><v>1</v></c></row></sheetData></worksheet>"#;
        let error = read_resumo(far_cell).err().unwrap();
        assert!(matches!(
            error,
            GradeStatsError::SpreadsheetError(SpreadsheetError::CellReferenceError(_, _, ref reference)) if reference == "XFE1"
        ));

        let far_row = r#"<worksheet><sheetData><row r="99999999999"><c t="inlineStr"><is><t>x</t></is></c></row></sheetData></worksheet>"#;
        let error = read_resumo(far_row).err().unwrap();
        assert!(matches!(
            error,
            GradeStatsError::SpreadsheetError(SpreadsheetError::CellReferenceError(_, _, ref reference)) if reference == "99999999999"
        ));
    }

    #[test]
    fn positional_cells_stop_at_the_last_column() {
        let mut cells = String::new();
        for _ in 0..=XLSX_LIMITS.cols {
            cells.push_str("<c><v>1</v></c>");
        }
        let wide_row = format!(r#"<worksheet><sheetData><row r="1">{cells}</row></sheetData></worksheet>"#);
        let error = read_resumo(&wide_row).err().unwrap();
        assert!(matches!(
            error,
            GradeStatsError::SpreadsheetError(SpreadsheetError::CellOutOfRangeError(_, _, 1, 16_385))
        ));
    }

    #[test]
    fn last_cell_of_the_sheet_is_accepted() {
        let last_cell = r#"<worksheet><sheetData><row r="1048576"><c r="XFD1048576"><v>7</v></c></row></sheetData></worksheet>"#;
        let grid = read_resumo(last_cell).unwrap().into_grid(&[]).unwrap();
        assert_eq!(grid.get(1_048_575, 16_383), &CellValue::Number(7.0));
    }
}
