use crate::spreadsheet::CellValue;
use serde::ser::SerializeMap;
use serde::ser::SerializeSeq;
use serde::Serialize;
use serde::Serializer;
use std::fmt;

/// One student row of the class sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct StudentRecord {
    /// Number or code as typed in the sheet; never empty.
    pub id: CellValue,
    /// Empty when the name cell is blank.
    pub name: String,
    /// Normalized grades, aligned with [`StructuredTable::subjects`].
    pub grades: Vec<Option<f64>>,
}

impl StudentRecord {
    /// Number of graded subjects satisfying `predicate`.
    pub fn count_grades<P>(&self, predicate: P) -> usize
    where
        P: Fn(f64) -> bool,
    {
        self.grades.iter().flatten().filter(|grade| predicate(**grade)).count()
    }

    pub fn is_evaluated(&self) -> bool {
        self.grades.iter().any(Option::is_some)
    }
}

/// Students in sheet order with their grades per subject.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructuredTable {
    subjects: Vec<String>,
    students: Vec<StudentRecord>,
}

impl StructuredTable {
    pub fn new(subjects: Vec<String>, students: Vec<StudentRecord>) -> StructuredTable {
        StructuredTable { subjects, students }
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn students(&self) -> &[StudentRecord] {
        &self.students
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    pub fn subject_index(&self, subject: &str) -> Option<usize> {
        self.subjects.iter().position(|name| name == subject)
    }

    /// Grade of the student with `id` in `subject`.
    pub fn grade(&self, id: &CellValue, subject: &str) -> Option<f64> {
        let index = self.subject_index(subject)?;
        self.students
            .iter()
            .find(|student| &student.id == id)
            .and_then(|student| student.grades.get(index).copied().flatten())
    }
}

struct StudentRow<'a> {
    subjects: &'a [String],
    student: &'a StudentRecord,
}

impl Serialize for StudentRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.subjects.len() + 2))?;
        map.serialize_entry("id", &self.student.id)?;
        map.serialize_entry("name", &self.student.name)?;
        for (subject, grade) in self.subjects.iter().zip(&self.student.grades) {
            map.serialize_entry(subject, grade)?;
        }
        map.end()
    }
}

/// A list of `{"id", "name", <subject>...}` objects, columns in subject order.
impl Serialize for StructuredTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.students.len()))?;
        for student in &self.students {
            seq.serialize_element(&StudentRow { subjects: &self.subjects, student })?;
        }
        seq.end()
    }
}

/// Plain-text table with left-aligned columns; missing grades print as `-`.
impl fmt::Display for StructuredTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rows: Vec<Vec<String>> = Vec::with_capacity(self.students.len() + 1);
        rows.push(
            ["ID", "Nome"].iter().map(|header| header.to_string())
                .chain(self.subjects.iter().cloned())
                .collect(),
        );
        for student in &self.students {
            rows.push(
                [student.id.to_string(), student.name.to_owned()].into_iter()
                    .chain(student.grades.iter().map(|grade| match grade {
                        Some(grade) => grade.to_string(),
                        None => "-".to_owned(),
                    }))
                    .collect(),
            );
        }

        let widths: Vec<usize> = (0..rows[0].len())
            .map(|col| rows.iter().map(|row| row[col].chars().count()).max().unwrap_or(0))
            .collect();
        for row in &rows {
            let line = row.iter().zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ");
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}
