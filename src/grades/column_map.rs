use crate::grades::layout::SheetLayout;
use crate::spreadsheet::Grid;
use tracing::debug;

/// Subject → column index, in first-registration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMap {
    entries: Vec<(String, usize)>,
}

impl ColumnMap {
    /// Registers a subject. A subject seen again moves to the new column but
    /// keeps its original position in the map.
    pub fn insert(&mut self, subject: &str, col: usize) {
        match self.entries.iter_mut().find(|(name, _)| name == subject) {
            Some(entry) => entry.1 = col,
            None => self.entries.push((subject.to_owned(), col)),
        }
    }

    pub fn get(&self, subject: &str) -> Option<usize> {
        self.entries.iter().find(|(name, _)| name == subject).map(|(_, col)| *col)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(name, col)| (name.as_str(), *col))
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Scans the subject row left to right, carrying the last non-empty label
/// forward, and registers every column flagged with the sentinel.
pub fn build_column_map(grid: &Grid, layout: &SheetLayout) -> ColumnMap {
    let (map, _) = (0..grid.width()).fold(
        (ColumnMap::default(), None::<String>),
        |(mut map, current), col| {
            let label = grid.get(layout.subject_row, col);
            let current = if label.is_empty() {
                current
            } else {
                Some(label.to_string().trim().to_owned())
            };
            let is_flagged = grid.get(layout.flag_row, col).as_text() == Some(layout.sentinel);
            match current.as_deref() {
                Some(subject) if is_flagged && !subject.is_empty() => map.insert(subject, col),
                _ => (),
            }
            (map, current)
        },
    );
    debug!(subjects = ?map.subjects().collect::<Vec<_>>(), "column map built");
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::CellValue;

    fn grid(subjects: &[&str], flags: &[&str]) -> Grid {
        let mut rows = vec![Vec::new(); 11];
        rows.push(subjects.iter().map(|value| CellValue::from(*value)).collect());
        rows.push(flags.iter().map(|value| CellValue::from(*value)).collect());
        Grid::new(rows)
    }

    fn entries(map: &ColumnMap) -> Vec<(&str, usize)> {
        map.iter().collect()
    }

    #[test]
    fn forward_fills_labels() {
        let grid = grid(&["", "", "", "PORT.", "", "Mat", ""], &["", "", "", "P1", "CF", "P1", "CF"]);
        let map = build_column_map(&grid, &SheetLayout::STANDARD);
        assert_eq!(entries(&map), vec![("PORT.", 4), ("Mat", 6)]);
    }

    #[test]
    fn labels_are_trimmed() {
        let grid = grid(&["", "", "", " Ing "], &["", "", "", "CF"]);
        assert_eq!(build_column_map(&grid, &SheetLayout::STANDARD).get("Ing"), Some(3));
    }

    #[test]
    fn flag_must_match_exactly() {
        let grid = grid(&["", "", "", "Mat", "Ing"], &["", "", "", " CF", "cf"]);
        assert!(build_column_map(&grid, &SheetLayout::STANDARD).is_empty());
    }

    #[test]
    fn no_subject_before_flag() {
        let grid = grid(&["", "", "", "Mat"], &["CF", "", "", ""]);
        assert!(build_column_map(&grid, &SheetLayout::STANDARD).is_empty());
    }

    #[test]
    fn blank_label_blocks_registration() {
        let grid = grid(&["", "", "", "Mat", "  "], &["", "", "", "", "CF"]);
        assert!(build_column_map(&grid, &SheetLayout::STANDARD).is_empty());
    }

    #[test]
    fn repeated_subject_keeps_position() {
        let grid = grid(&["", "", "Mat", "Ing", "Mat"], &["", "", "CF", "CF", "CF"]);
        let map = build_column_map(&grid, &SheetLayout::STANDARD);
        assert_eq!(entries(&map), vec![("Mat", 4), ("Ing", 3)]);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn numeric_labels_render_without_fraction() {
        let mut rows = vec![Vec::new(); 11];
        rows.push(vec![CellValue::Empty, CellValue::Number(2024.0)]);
        rows.push(vec![CellValue::Empty, "CF".into()]);
        let map = build_column_map(&Grid::new(rows), &SheetLayout::STANDARD);
        assert_eq!(map.get("2024"), Some(1));
    }
}
