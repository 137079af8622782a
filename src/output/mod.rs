pub mod json;
pub mod terminal;

use crate::result::AnalysisReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
}

pub fn print_report(report: &AnalysisReport, source: &str, verbose: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => json::print(report, source, verbose),
        OutputFormat::Terminal => terminal::print(report, source, verbose),
    }
}
