use serde::Serialize;
use std::fmt;

pub const TOTAL_STUDENTS: &str = "N.º de alunos da Turma";
pub const NOT_EVALUATED: &str = "N.º de alunos não avaliados";
pub const NO_NEGATIVES: &str = "N.º de alunos SEM menções inferiores a Suficiente";
pub const THREE_PLUS_NEGATIVES: &str = "N.º de alunos com TRÊS OU MAIS menções inferiores a Suficiente";
pub const ANY_NEGATIVE: &str = "N.º TOTAL de alunos com menções inferiores a Suficiente";
pub const PORTUGUESE_AND_MATH_NEGATIVE: &str =
    "N.º de alunos com menções inferiores a Suficiente cumulativamente a PORTUGUÊS e MATEMÁTICA";
pub const THREE_PLUS_MUITO_BOM: &str = "N.º de alunos com TRÊS OU MAIS menções de MUITO BOM";
pub const ANY_MUITO_BOM: &str = "N.º TOTAL de alunos com menções de MUITO BOM";
pub const TOP_INSUFICIENTE: &str = "As 3 disciplinas com maior número de menções de INSUFICIENTE";
pub const MAX_DISPERSION: &str = "As disciplinas com MAIOR DISPERSÃO/AMPLITUDE DE RESULTADOS";

/// Only entry of the report of a sheet without students.
pub const ERROR: &str = "Erro";
pub const NO_STUDENTS_MESSAGE: &str = "Não foram encontrados dados de alunos.";

pub const COLUMNS_NOT_FOUND: &str = "N/A (Colunas não encontradas)";
pub const NOT_AVAILABLE: &str = "N/A";

/// A metric is either a head count or a free text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(usize),
    Text(String),
}

impl MetricValue {
    pub fn as_count(&self) -> Option<usize> {
        match self {
            MetricValue::Count(count) => Some(*count),
            MetricValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(count) => write!(f, "{count}"),
            MetricValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<usize> for MetricValue {
    fn from(count: usize) -> Self {
        MetricValue::Count(count)
    }
}

impl From<String> for MetricValue {
    fn from(text: String) -> Self {
        MetricValue::Text(text)
    }
}

impl From<&str> for MetricValue {
    fn from(text: &str) -> Self {
        MetricValue::Text(text.to_owned())
    }
}
