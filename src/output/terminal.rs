use std::collections::{BTreeMap, HashMap};

use colored::{ColoredString, Colorize};

use crate::model::stats::{percent, StatsAccumulator};
use crate::model::validation::ValidationResult;
use crate::result::{AnalysisReport, DetailRow, Presence, UrlCheck};

pub fn print(report: &AnalysisReport, source: &str, verbose: bool) {
    println!("\n{} {}", "── Metadata ──".bold(), source.dimmed());

    println!("\n{}", "── All entities ──".bold());
    print_scope(&report.global, report.validated);

    if !report.federations.is_empty() {
        println!("\n{}", "── Federations ──".bold());
        print_federation_table(&report.federations);
    }

    if verbose {
        println!("\n{}", "── Entities ──".bold());
        for row in &report.rows {
            print_row(row);
        }
    }

    println!();
    print_summary(&report.global);
}

fn print_scope(stats: &StatsAccumulator, validated: bool) {
    println!(
        "  Entities {}  (SPs {}, IdPs {})",
        stats.total_entities, stats.total_sps, stats.total_idps
    );
    print_line(
        "SP privacy statement",
        stats.sps_has_privacy,
        stats.sps_missing_privacy,
    );
    print_line(
        "Security contact",
        stats.total_has_security,
        stats.total_missing_security,
    );
    print_line("  of which SPs", stats.sps_has_security, stats.sps_missing_security);
    print_line("  of which IdPs", stats.idps_has_security, stats.idps_missing_security);
    print_line("SIRTFI", stats.total_has_sirtfi, stats.total_missing_sirtfi);
    print_line("  of which SPs", stats.sps_has_sirtfi, stats.sps_missing_sirtfi);
    print_line("  of which IdPs", stats.idps_has_sirtfi, stats.idps_missing_sirtfi);
    println!(
        "  {:<24} {} both, {} partial, {} neither",
        "SP privacy + security",
        stats.sps_has_both.to_string().green(),
        stats.sps_partial_compliance().to_string().yellow(),
        stats.sps_missing_both.to_string().red(),
    );
    if validated {
        println!(
            "  {:<24} {} checked, {} accessible, {} broken",
            "Privacy URLs",
            stats.urls_checked,
            stats.urls_accessible.to_string().green(),
            colorize_broken(stats.urls_broken),
        );
    }
}

fn print_line(label: &str, has: u64, missing: u64) {
    let pct = percent(has, has + missing);
    println!(
        "  {:<24} {:>6} yes {:>6} no  {}",
        label,
        has,
        missing,
        colorize_pct(pct)
    );
}

fn print_federation_table(federations: &BTreeMap<String, StatsAccumulator>) {
    let width = federations.keys().map(|k| k.chars().count()).max().unwrap_or(0).max(10);
    println!(
        "  {:<width$} {:>8} {:>6} {:>6} {:>9} {:>9} {:>9}",
        "Federation".dimmed(),
        "Entities".dimmed(),
        "SPs".dimmed(),
        "IdPs".dimmed(),
        "Privacy".dimmed(),
        "Security".dimmed(),
        "SIRTFI".dimmed(),
        width = width
    );
    for (name, stats) in federations {
        println!(
            "  {:<width$} {:>8} {:>6} {:>6} {:>9} {:>9} {:>9}",
            name,
            stats.total_entities,
            stats.total_sps,
            stats.total_idps,
            format!("{:.1}%", stats.sp_privacy_coverage()),
            format!("{:.1}%", stats.security_coverage()),
            format!("{:.1}%", stats.sirtfi_coverage()),
            width = width
        );
    }
}

fn print_row(row: &DetailRow) {
    println!(
        "  {} [{}] {} {}",
        presence_icon(row.security),
        row.role.dimmed(),
        row.entity_id,
        format!("({}, {})", row.org_name, row.federation).dimmed()
    );
    let privacy = match (&row.privacy, &row.privacy_url) {
        (Presence::Yes, Some(url)) => format!("privacy {}", url),
        (p, _) => format!("privacy {}", p),
    };
    println!(
        "       {} {} | security {} | sirtfi {}",
        "→".dimmed(),
        privacy,
        row.security,
        row.sirtfi
    );
    if let Some(ref check) = row.url_check {
        let label = match check {
            UrlCheck::Checked(r) if r.accessible => check.status_label().green(),
            UrlCheck::Checked(_) => check.status_label().red(),
            UrlCheck::NotChecked => check.status_label().dimmed(),
        };
        println!("       {} url: {}", "→".dimmed(), label);
    }
}

pub fn print_url_results(results: &HashMap<String, ValidationResult>) {
    let sorted: BTreeMap<&String, &ValidationResult> = results.iter().collect();
    for (url, result) in sorted {
        let status = if result.accessible {
            "OK".green().bold()
        } else {
            "BROKEN".red().bold()
        };
        let detail = match result.error {
            Some(ref e) => e.clone(),
            None => format!("HTTP {}", result.status_code),
        };
        println!("  {} {} {}", status, url, format!("[{}]", detail).dimmed());
        if result.redirect_count > 0 {
            println!(
                "       {} {} redirect(s) to {}",
                "↳".dimmed(),
                result.redirect_count,
                result.final_url
            );
        }
        if let Some(ref vendor) = result.protection_detected {
            let retry = match (&result.retry_method, result.retry_succeeded) {
                (Some(m), Some(true)) => format!(", {} retry succeeded", m),
                (Some(m), _) => format!(", {} retry failed", m),
                _ => String::new(),
            };
            println!("       {} protected by {}{}", "↳".dimmed(), vendor, retry);
        }
        if result.from_cache {
            println!("       {} {}", "↳".dimmed(), "from cache".dimmed());
        }
    }
}

fn print_summary(stats: &StatsAccumulator) {
    let line = format!(
        "Summary: {} entities | SP privacy {:.1}% | security {:.1}% | SIRTFI {:.1}%",
        stats.total_entities,
        stats.sp_privacy_coverage(),
        stats.security_coverage(),
        stats.sirtfi_coverage(),
    );
    println!("{}", line.bold());
}

fn presence_icon(p: Presence) -> ColoredString {
    match p {
        Presence::Yes => "✓".green(),
        Presence::No => "✗".red(),
        Presence::NotApplicable => "-".dimmed(),
    }
}

fn colorize_pct(pct: f64) -> ColoredString {
    let text = format!("{:5.1}%", pct);
    if pct >= 75.0 {
        text.green()
    } else if pct >= 40.0 {
        text.yellow()
    } else {
        text.red()
    }
}

fn colorize_broken(count: u64) -> ColoredString {
    if count == 0 {
        count.to_string().green()
    } else {
        count.to_string().red()
    }
}
