//! Grade normalization: qualitative mentions map onto the 2..=5 scale, any
//! other value is read as a number.

use crate::spreadsheet::CellValue;
use phf::phf_map;

pub const INSUFICIENTE: f64 = 2.0;
pub const SUFICIENTE: f64 = 3.0;
pub const MUITO_BOM: f64 = 5.0;

/// Mention → grade. `--` marks a subject the student was not graded in.
static MENTION_SCALE: phf::Map<&'static str, Option<f64>> = phf_map! {
    "Insuficiente" => Some(INSUFICIENTE),
    "Suficiente" => Some(SUFICIENTE),
    "Bom" => Some(4.0),
    "Muito Bom" => Some(MUITO_BOM),
    "--" => None,
};

/// Outcome of reading one grade cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GradeValue {
    Score(f64),
    Missing,
    /// Text that is neither a mention nor a number
    Unreadable,
}

impl GradeValue {
    pub fn score(self) -> Option<f64> {
        match self {
            GradeValue::Score(score) => Some(score),
            _ => None,
        }
    }
}

pub fn classify(value: &CellValue) -> GradeValue {
    match value {
        CellValue::Empty => GradeValue::Missing,
        CellValue::Number(number) => from_number(*number),
        CellValue::Bool(flag) => GradeValue::Score(if *flag { 1.0 } else { 0.0 }),
        CellValue::Text(text) => {
            let text = text.trim();
            if let Some(&mention) = MENTION_SCALE.get(text) {
                return mention.map(GradeValue::Score).unwrap_or(GradeValue::Missing);
            }
            if text.is_empty() {
                return GradeValue::Missing;
            }
            text.parse::<f64>()
                .map(from_number)
                .unwrap_or(GradeValue::Unreadable)
        }
    }
}

/// Normalized grade of a cell; missing when absent or unreadable.
pub fn normalize_grade(value: &CellValue) -> Option<f64> {
    classify(value).score()
}

fn from_number(number: f64) -> GradeValue {
    if number.is_nan() {
        GradeValue::Missing
    } else {
        GradeValue::Score(number)
    }
}
