use glob::Pattern;

/// Which worksheet to read and how strictly to treat its cells.
#[derive(Clone, Debug)]
pub struct Criteria {
    /// Sheet name pattern; the first worksheet is read when absent.
    pub sheet_name_pattern: Option<Pattern>,

    /// Keep error cells (`#N/A`, `#DIV/0!`) as their literal text instead of
    /// failing the read.
    pub error_as_text: bool,
}

impl Default for Criteria {
    fn default() -> Self {
        Criteria {
            sheet_name_pattern: None,
            error_as_text: true,
        }
    }
}

impl Criteria {
    /// Builds criteria from an optional glob such as `"Turma*"`.
    pub fn new(sheet_name: Option<&str>, error_as_text: bool) -> Result<Criteria, glob::PatternError> {
        Ok(Criteria {
            sheet_name_pattern: sheet_name.map(Pattern::new).transpose()?,
            error_as_text,
        })
    }

    /// Checks if a sheet name matches the criteria pattern.
    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        self.sheet_name_pattern
            .as_ref()
            .map(|pattern| pattern.matches(sheet_name))
            .unwrap_or(true)
    }

    /// First sheet, in workbook order, accepted by the criteria.
    pub(crate) fn select<'a>(&self, sheet_names: &'a [String]) -> Option<&'a str> {
        sheet_names.iter().find(|name| self.accept(name)).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_sheet() {
        let names = vec!["Pauta".to_owned(), "Resumo".to_owned()];
        assert_eq!(Criteria::default().select(&names), Some("Pauta"));
    }

    #[test]
    fn glob_selects_sheet() {
        let names = vec!["Pauta".to_owned(), "Resumo 1P".to_owned()];
        let criteria = Criteria::new(Some("Resumo*"), true).unwrap();
        assert_eq!(criteria.select(&names), Some("Resumo 1P"));
        let criteria = Criteria::new(Some("Outra"), true).unwrap();
        assert_eq!(criteria.select(&names), None);
    }

    #[test]
    fn invalid_glob_is_rejected() {
        assert!(Criteria::new(Some("[abc"), true).is_err());
    }
}
