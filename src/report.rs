//! Rendering of an [`Analysis`] for the terminal or as JSON.

use crate::error::GradeStatsError;
use crate::grades::CoercionWarning;
use crate::grades::StructuredTable;
use crate::statistics::StatisticsReport;
use crate::Analysis;
use serde::Serialize;
use std::fmt;

pub const RESULTS_HEADING: &str = "Resultados Estatísticos";
pub const ERROR_PREFIX: &str = "Ocorreu um erro ao processar o ficheiro";
pub const LAYOUT_HINT: &str = "Verifique se o ficheiro Excel segue a estrutura correta (linhas 11, 12 e 13).";

pub fn summary_message(statistics: &StatisticsReport) -> String {
    format!(
        "Ficheiro processado com sucesso! {} alunos detetados.",
        statistics.total_students().unwrap_or(0)
    )
}

pub fn failure_message<E: fmt::Display + ?Sized>(error: &E) -> String {
    format!("{ERROR_PREFIX}: {error}")
}

/// Optional sections of the text report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextOptions {
    pub table: bool,
    pub warnings: bool,
}

struct TextReport<'a> {
    analysis: &'a Analysis,
    options: TextOptions,
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let analysis = self.analysis;
        writeln!(f, "{}", summary_message(&analysis.statistics))?;
        writeln!(f)?;
        writeln!(f, "{RESULTS_HEADING}")?;
        for (label, value) in analysis.statistics.entries() {
            writeln!(f)?;
            writeln!(f, "{label}:")?;
            writeln!(f, "> {value}")?;
        }
        if self.options.table {
            writeln!(f)?;
            writeln!(f, "Tabela de alunos")?;
            write!(f, "{}", analysis.table)?;
        }
        if self.options.warnings {
            writeln!(f)?;
            writeln!(f, "Avisos")?;
            if analysis.warnings.is_empty() {
                writeln!(f, "(nenhum)")?;
            }
            for warning in &analysis.warnings {
                writeln!(f, "- {warning}")?;
            }
        }
        Ok(())
    }
}

pub fn render_text(analysis: &Analysis, options: TextOptions) -> String {
    TextReport { analysis, options }.to_string()
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: String,
    statistics: &'a StatisticsReport,
    table: &'a StructuredTable,
    warnings: &'a [CoercionWarning],
}

pub fn render_json(analysis: &Analysis) -> Result<String, GradeStatsError> {
    let report = JsonReport {
        summary: summary_message(&analysis.statistics),
        statistics: &analysis.statistics,
        table: &analysis.table,
        warnings: &analysis.warnings,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grades::StudentRecord;
    use crate::spreadsheet::CellValue;
    use crate::statistics::compute;
    use crate::statistics::TOTAL_STUDENTS;

    fn analysis() -> Analysis {
        let table = StructuredTable::new(
            vec!["Mat".to_owned()],
            vec![StudentRecord { id: CellValue::Number(1.0), name: "Ana".to_owned(), grades: vec![Some(2.0)] }],
        );
        Analysis {
            statistics: compute(&table),
            table,
            warnings: vec![CoercionWarning { reference: "D15".to_owned(), subject: "Mat".to_owned(), raw: "x".to_owned() }],
        }
    }

    #[test]
    fn summary_counts_students() {
        assert_eq!(summary_message(&analysis().statistics), "Ficheiro processado com sucesso! 1 alunos detetados.");
        let empty = compute(&StructuredTable::default());
        assert_eq!(summary_message(&empty), "Ficheiro processado com sucesso! 0 alunos detetados.");
    }

    #[test]
    fn text_report() {
        let text = render_text(&analysis(), TextOptions::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Ficheiro processado com sucesso! 1 alunos detetados.");
        assert_eq!(lines[2], RESULTS_HEADING);
        assert_eq!(lines[4], format!("{TOTAL_STUDENTS}:"));
        assert_eq!(lines[5], "> 1");
        assert!(text.contains("> Mat (Amplitude: 0)\n"));
        assert!(!text.contains("Avisos"));
    }

    #[test]
    fn text_report_sections() {
        let text = render_text(&analysis(), TextOptions { table: true, warnings: true });
        assert!(text.contains("ID  Nome  Mat\n1   Ana   2\n"), "{text}");
        assert!(text.ends_with("Avisos\n- D15 (Mat): 'x' is not a grade\n"), "{text}");
    }

    #[test]
    fn json_report() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&analysis()).unwrap()).unwrap();
        assert_eq!(json["summary"], "Ficheiro processado com sucesso! 1 alunos detetados.");
        assert_eq!(json["statistics"][TOTAL_STUDENTS], 1);
        assert_eq!(json["table"][0]["name"], "Ana");
        assert_eq!(json["table"][0]["Mat"], 2.0);
        assert_eq!(json["warnings"][0]["reference"], "D15");
    }

    #[test]
    fn failure() {
        assert_eq!(failure_message("boom"), "Ocorreu um erro ao processar o ficheiro: boom");
    }
}
