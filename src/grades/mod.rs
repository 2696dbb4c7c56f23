//! # Grade extraction
//!
//! Turns the raw grid of a class export into a [`StructuredTable`]. The export
//! lists subject labels on one header row (only on the first column of each
//! subject), marks final-grade columns with `CF` on the next row, and lists one
//! student per row below that until a blank identifier.
mod column_map;
mod extractor;
mod grade;
mod layout;
mod table;

pub use column_map::build_column_map;
pub use column_map::ColumnMap;
pub use extractor::extract;
pub use extractor::extract_with_warnings;
pub use extractor::CoercionWarning;
pub use extractor::Extraction;
pub use extractor::GradeExtractor;
pub use extractor::SchemaError;
pub use grade::classify;
pub use grade::normalize_grade;
pub use grade::GradeValue;
pub use grade::INSUFICIENTE;
pub use grade::MUITO_BOM;
pub use grade::SUFICIENTE;
pub use layout::SheetLayout;
pub use table::StructuredTable;
pub use table::StudentRecord;
