use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::model::stats::StatsAccumulator;
use crate::model::validation::ValidationResult;
use crate::result::{AnalysisReport, DetailRow};

#[derive(Serialize)]
struct Coverage {
    sp_privacy_pct: f64,
    security_pct: f64,
    sirtfi_pct: f64,
    sps_partial_compliance: u64,
}

impl Coverage {
    fn of(stats: &StatsAccumulator) -> Self {
        Self {
            sp_privacy_pct: round2(stats.sp_privacy_coverage()),
            security_pct: round2(stats.security_coverage()),
            sirtfi_pct: round2(stats.sirtfi_coverage()),
            sps_partial_compliance: stats.sps_partial_compliance(),
        }
    }
}

#[derive(Serialize)]
struct ScopeReport<'a> {
    #[serde(flatten)]
    stats: &'a StatsAccumulator,
    coverage: Coverage,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    source: &'a str,
    validated: bool,
    global: ScopeReport<'a>,
    federations: BTreeMap<&'a str, ScopeReport<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entities: Option<&'a [DetailRow]>,
}

pub fn print(report: &AnalysisReport, source: &str, verbose: bool) {
    let json = JsonReport {
        source,
        validated: report.validated,
        global: ScopeReport {
            stats: &report.global,
            coverage: Coverage::of(&report.global),
        },
        federations: report
            .federations
            .iter()
            .map(|(name, stats)| {
                (
                    name.as_str(),
                    ScopeReport {
                        stats,
                        coverage: Coverage::of(stats),
                    },
                )
            })
            .collect(),
        entities: verbose.then_some(report.rows.as_slice()),
    };
    emit(&json);
}

pub fn print_url_results(results: &HashMap<String, ValidationResult>) {
    let sorted: BTreeMap<&String, &ValidationResult> = results.iter().collect();
    emit(&sorted);
}

fn emit<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize JSON: {}", e),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
