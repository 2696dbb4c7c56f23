/// Fixed positions of the school export. Rows and columns are 0-based grid
/// indexes, so the subject row 11 is spreadsheet row 12.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SheetLayout {
    /// Row holding the (sparse) subject labels
    pub subject_row: usize,
    /// Row holding the column kind; only `sentinel` columns carry grades
    pub flag_row: usize,
    /// First student row
    pub data_start_row: usize,
    pub id_col: usize,
    pub name_col: usize,
    /// Flag marking the final-grade ("classificação final") column of a subject
    pub sentinel: &'static str,
}

impl SheetLayout {
    pub const STANDARD: SheetLayout = SheetLayout {
        subject_row: 11,
        flag_row: 12,
        data_start_row: 13,
        id_col: 0,
        name_col: 2,
        sentinel: "CF",
    };
}

impl Default for SheetLayout {
    fn default() -> Self {
        SheetLayout::STANDARD
    }
}
