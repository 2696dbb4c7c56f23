//! Conversions between A1-style cell references and 0-based indexes.

use regex::Regex;
use std::sync::LazyLock;

/// Row and column capacity of a worksheet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct SheetLimits {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
}

impl SheetLimits {
    pub(crate) fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }
}

/// Office Open XML worksheets end at XFD1048576.
pub(crate) const XLSX_LIMITS: SheetLimits = SheetLimits { rows: 1_048_576, cols: 16_384 };

/// BIFF8 worksheets end at IV65536.
pub(crate) const XLS_LIMITS: SheetLimits = SheetLimits { rows: 65_536, cols: 256 };

static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([1-9][0-9]*)$").expect("Hardcode regex pattern"));

/// "A" → 0, "Z" → 25, "AA" → 26.
pub(crate) fn col_to_index(col: &str) -> Option<usize> {
    if col.is_empty() {
        return None;
    }
    col.bytes().try_fold(0usize, |index, byte| {
        byte.is_ascii_alphabetic()
            .then(|| index * 26 + (byte.to_ascii_uppercase() - b'A') as usize + 1)
    })
    .map(|index| index - 1)
}

/// "1" → 0.
pub(crate) fn row_to_index(row: &str) -> Option<usize> {
    row.parse::<usize>().ok().and_then(|row| row.checked_sub(1))
}

/// "B12" → (11, 1). Absolute markers (`$B$12`) are accepted; references
/// past XFD1048576 are not.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let captures = REFERENCE_PATTERN.captures(reference)?;
    let col = col_to_index(captures.get(1)?.as_str())?;
    let row = row_to_index(captures.get(2)?.as_str())?;
    XLSX_LIMITS.contains(row, col).then_some((row, col))
}

/// (11, 1) → "B12".
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    let mut letters = Vec::new();
    let mut col = col + 1;
    while col > 0 {
        col -= 1;
        letters.push(b'A' + (col % 26) as u8);
        col /= 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns() {
        assert_eq!(col_to_index("A"), Some(0));
        assert_eq!(col_to_index("z"), Some(25));
        assert_eq!(col_to_index("AA"), Some(26));
        assert_eq!(col_to_index("XFD"), Some(16383));
        assert_eq!(col_to_index(""), None);
        assert_eq!(col_to_index("A1"), None);
    }

    #[test]
    fn references() {
        assert_eq!(reference_to_index("A1"), Some((0, 0)));
        assert_eq!(reference_to_index("F14"), Some((13, 5)));
        assert_eq!(reference_to_index("$AB$100"), Some((99, 27)));
        assert_eq!(reference_to_index("A0"), None);
        assert_eq!(reference_to_index("12"), None);
    }

    #[test]
    fn references_past_the_sheet_end() {
        assert_eq!(reference_to_index("XFD1048576"), Some((1_048_575, 16_383)));
        assert_eq!(reference_to_index("XFE1"), None);
        assert_eq!(reference_to_index("A1048577"), None);
        assert_eq!(reference_to_index("A99999999999999999999999"), None);
    }

    #[test]
    fn limits() {
        assert!(XLS_LIMITS.contains(65_535, 255));
        assert!(!XLS_LIMITS.contains(65_536, 0));
        assert!(!XLS_LIMITS.contains(0, 256));
        assert!(XLSX_LIMITS.contains(65_536, 256));
    }

    #[test]
    fn back_to_references() {
        assert_eq!(index_to_reference(0, 0), "A1");
        assert_eq!(index_to_reference(11, 25), "Z12");
        assert_eq!(index_to_reference(12, 26), "AA13");
        for (row, col) in [(0, 0), (13, 701), (99, 702)] {
            assert_eq!(reference_to_index(&index_to_reference(row, col)), Some((row, col)));
        }
    }
}
