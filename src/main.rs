use anyhow::Context;
use anyhow::Result;
use clap::ArgAction;
use clap::Parser;
use clap::ValueEnum;
use grade_stats::logger;
use grade_stats::report;
use grade_stats::report::TextOptions;
use grade_stats::spreadsheet::Criteria;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "grade-stats")]
#[command(version, about = "Class statistics from a school grade sheet (.xls/.xlsx)", long_about = None)]
struct Cli {
    /// Grade sheet exported by the school software
    file: PathBuf,

    /// Worksheet name or glob pattern (defaults to the first worksheet)
    #[arg(long, value_name = "GLOB")]
    sheet: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Also print the student table
    #[arg(long)]
    table: bool,

    /// Also print grade cells that could not be read
    #[arg(long)]
    warnings: bool,

    /// Fail on error cells (#N/A, #DIV/0!) instead of reading them as text
    #[arg(long)]
    strict_cells: bool,

    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.verbose);
    match run(&cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{}", report::failure_message(&format!("{error:#}")));
            eprintln!("{}", report::LAYOUT_HINT);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String> {
    let criteria = Criteria::new(cli.sheet.as_deref(), !cli.strict_cells)
        .context("Invalid --sheet pattern")?;
    let analysis = grade_stats::analyze_file(&cli.file, &criteria)
        .with_context(|| format!("'{}'", cli.file.display()))?;
    let output = match cli.format {
        OutputFormat::Text => report::render_text(&analysis, TextOptions { table: cli.table, warnings: cli.warnings }),
        OutputFormat::Json => report::render_json(&analysis)? + "\n",
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from(["grade-stats", "turma.xlsx", "--sheet", "Pauta*", "--format", "json", "--strict-cells", "-vv"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("turma.xlsx"));
        assert_eq!(cli.sheet.as_deref(), Some("Pauta*"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.strict_cells);
        assert!(!cli.table);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn file_is_required() {
        assert!(Cli::try_parse_from(["grade-stats"]).is_err());
    }

    #[test]
    fn unsupported_file_fails() {
        let cli = Cli::try_parse_from(["grade-stats", "notas.csv"]).unwrap();
        let error = run(&cli).unwrap_err();
        assert!(format!("{error:#}").contains("expected .xls or .xlsx"));
    }
}
