//! # Class statistics
//!
//! Ten fixed metrics over a [`StructuredTable`]. Students without any grade
//! are counted as "not evaluated" and left out of every other metric.
mod metric;

pub use metric::*;

use crate::grades::StructuredTable;
use crate::grades::StudentRecord;
use crate::grades::INSUFICIENTE;
use crate::grades::MUITO_BOM;
use crate::grades::SUFICIENTE;
use serde::ser::SerializeMap;
use serde::Serialize;
use serde::Serializer;
use tracing::debug;

const PORTUGUESE: &str = "PORT.";
const MATH: &str = "Mat";

/// Labeled metrics in presentation order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatisticsReport {
    entries: Vec<(&'static str, MetricValue)>,
}

impl StatisticsReport {
    fn push<V: Into<MetricValue>>(&mut self, label: &'static str, value: V) {
        self.entries.push((label, value.into()));
    }

    pub fn entries(&self) -> &[(&'static str, MetricValue)] {
        &self.entries
    }

    pub fn get(&self, label: &str) -> Option<&MetricValue> {
        self.entries.iter().find(|(name, _)| *name == label).map(|(_, value)| value)
    }

    /// Head count of the class, absent when no student was found.
    pub fn total_students(&self) -> Option<usize> {
        self.get(TOTAL_STUDENTS).and_then(MetricValue::as_count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A JSON object whose keys keep the presentation order.
impl Serialize for StatisticsReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

pub fn compute(table: &StructuredTable) -> StatisticsReport {
    let mut report = StatisticsReport::default();
    if table.is_empty() {
        report.push(ERROR, NO_STUDENTS_MESSAGE);
        return report;
    }

    let evaluated: Vec<&StudentRecord> = table.students().iter().filter(|student| student.is_evaluated()).collect();
    let negatives: Vec<usize> = evaluated.iter().map(|student| student.count_grades(|grade| grade < SUFICIENTE)).collect();
    let muito_bons: Vec<usize> = evaluated.iter().map(|student| student.count_grades(|grade| grade == MUITO_BOM)).collect();
    debug!(students = table.len(), evaluated = evaluated.len(), "computing statistics");

    report.push(TOTAL_STUDENTS, table.len());
    report.push(NOT_EVALUATED, table.len() - evaluated.len());
    report.push(NO_NEGATIVES, count_where(&negatives, |count| count == 0));
    report.push(THREE_PLUS_NEGATIVES, count_where(&negatives, |count| count >= 3));
    report.push(ANY_NEGATIVE, count_where(&negatives, |count| count >= 1));
    report.push(PORTUGUESE_AND_MATH_NEGATIVE, portuguese_and_math_negative(table, &evaluated));
    report.push(THREE_PLUS_MUITO_BOM, count_where(&muito_bons, |count| count >= 3));
    report.push(ANY_MUITO_BOM, count_where(&muito_bons, |count| count >= 1));
    report.push(TOP_INSUFICIENTE, top_insuficiente(table, &evaluated, 3));
    report.push(MAX_DISPERSION, max_dispersion(table, &evaluated));
    report
}

fn count_where<P: Fn(usize) -> bool>(counts: &[usize], predicate: P) -> usize {
    counts.iter().filter(|count| predicate(**count)).count()
}

fn portuguese_and_math_negative(table: &StructuredTable, evaluated: &[&StudentRecord]) -> MetricValue {
    let (Some(portuguese), Some(math)) = (table.subject_index(PORTUGUESE), table.subject_index(MATH)) else {
        return COLUMNS_NOT_FOUND.into();
    };
    let is_negative = |student: &StudentRecord, index: usize| {
        student.grades[index].map(|grade| grade < SUFICIENTE).unwrap_or(false)
    };
    evaluated
        .iter()
        .filter(|student| is_negative(**student, portuguese) && is_negative(**student, math))
        .count()
        .into()
}

/// Subjects with the most Insuficiente grades; ties keep subject order.
fn top_insuficiente(table: &StructuredTable, evaluated: &[&StudentRecord], limit: usize) -> String {
    let mut counts: Vec<(&str, usize)> = table
        .subjects()
        .iter()
        .enumerate()
        .map(|(index, subject)| {
            let count = evaluated.iter().filter(|student| student.grades[index] == Some(INSUFICIENTE)).count();
            (subject.as_str(), count)
        })
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.iter().take(limit).map(|(subject, _)| *subject).collect::<Vec<_>>().join(", ")
}

/// Subjects whose grade range (max − min) is the widest.
fn max_dispersion(table: &StructuredTable, evaluated: &[&StudentRecord]) -> String {
    let amplitudes: Vec<(&str, f64)> = table
        .subjects()
        .iter()
        .enumerate()
        .filter_map(|(index, subject)| {
            let grades = evaluated.iter().filter_map(|student| student.grades[index]);
            let (min, max) = grades.fold(None, |range: Option<(f64, f64)>, grade| match range {
                Some((min, max)) => Some((min.min(grade), max.max(grade))),
                None => Some((grade, grade)),
            })?;
            let amplitude = max - min;
            (!amplitude.is_nan()).then_some((subject.as_str(), amplitude))
        })
        .collect();
    let Some(widest) = amplitudes.iter().map(|(_, amplitude)| *amplitude).reduce(f64::max) else {
        return NOT_AVAILABLE.to_owned();
    };
    let subjects: Vec<&str> = amplitudes
        .iter()
        .filter(|(_, amplitude)| *amplitude == widest)
        .map(|(subject, _)| *subject)
        .collect();
    format!("{} (Amplitude: {})", subjects.join(", "), widest)
}
