//! Office Open XML package helpers
use crate::error::GradeStatsError;
use crate::helpers::cfb::Cfb;
use crate::helpers::reader::SourceReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::debug;
use zip::ZipArchive;

const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Opens a workbook package and lists its worksheets as (name, zip path)
/// pairs in workbook order.
pub(super) fn open<W>(file_name: &str, mut source: SourceReader, load_workbook: W) -> Result<(
    ZipArchive<SourceReader>,
    Vec<(String, String)>,
), GradeStatsError>
where
    W: Fn(&mut ZipArchive<SourceReader>) -> Result<Vec<(String, String)>, GradeStatsError>,
{
    if is_password_protected(&mut source) {
        Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
    }

    let mut zip = ZipArchive::new(source)?;
    let sheets = load_workbook(&mut zip)?;
    if sheets.is_empty() {
        Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
    }
    debug!(file = file_name, sheets = sheets.len(), "workbook package opened");
    Ok((zip, sheets))
}

/// Maps relationship ids to worksheet part paths.
pub(super) fn load_relationships(zip: &mut ZipArchive<SourceReader>, path: &str) -> Result<HashMap<String, String>, GradeStatsError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // chartsheets and dialog sheets carry no cells
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Resolves a relationship target against the `xl/` folder.
pub(crate) fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(absolute) = path.strip_prefix('/') {
        absolute.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{}", path.trim_start_matches("./"))
    }
}

/// Encrypted packages are OLE containers holding an `EncryptedPackage` stream.
fn is_password_protected(source: &mut SourceReader) -> bool {
    if let Ok(cfb) = Cfb::new(source) {
        cfb.exists("EncryptedPackage")
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path(Cow::Borrowed("worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("/xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("xl/worksheets/sheet2.xml")), "xl/worksheets/sheet2.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("./worksheets/sheet3.xml")), "xl/worksheets/sheet3.xml");
    }

    #[test]
    fn garbage_is_not_a_package() {
        let source = SourceReader::from_bytes(b"definitely not a zip".to_vec());
        assert!(open("pauta.xlsx", source, |_| Ok(Vec::new())).is_err());
    }
}
