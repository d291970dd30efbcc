//! Human-readable rendering of generation summaries and validation reports.

use console::style;

use crate::synth::GenerationSummary;
use crate::ui::icons::{CHART, CHECK, CLOCK, CROSS, DATABASE, INFO, LINK, WARN};
use crate::validate::{Finding, Severity, ValidationReport};

fn separator() -> String {
    format!("{}", style("=".repeat(60)).cyan())
}

fn status_icon(finding: &Finding) -> String {
    match (finding.passed, finding.severity) {
        (_, Severity::Info) => INFO.to_string(),
        (true, _) => CHECK.to_string(),
        (false, Severity::Warning) => WARN.to_string(),
        (false, _) => CROSS.to_string(),
    }
}

fn print_finding(finding: &Finding) {
    let check = if finding.passed || finding.severity == Severity::Info {
        style(finding.check.as_str())
    } else if finding.severity == Severity::Warning {
        style(finding.check.as_str()).yellow()
    } else {
        style(finding.check.as_str()).red().bold()
    };
    println!(
        "  {}{}: {}",
        status_icon(finding),
        check,
        style(&finding.detail).dim()
    );
}

/// Per-table row counts and store size printed after a generation run.
pub fn print_generation_summary(
    summary: &GenerationSummary,
    table_counts: &[(&str, i64)],
    size_bytes: u64,
) {
    println!("\n{}", separator());
    println!("{}", style("GENERATION SUMMARY").bold());
    println!("{}", separator());
    for (table, rows) in table_counts {
        println!("  {:<22} {:>10}", table, rows);
    }
    println!(
        "\n  {} archived of {} projects",
        summary.archived_projects, summary.projects
    );
    println!(
        "  {}Database size: {:.2} MB",
        DATABASE,
        size_bytes as f64 / (1024.0 * 1024.0)
    );
    println!("{}", separator());
}

/// Full report grouped by check kind, ending in a PASS/FAIL banner.
pub fn print_validation_report(report: &ValidationReport) {
    println!("{}", separator());
    println!("{}", style("DATABASE VALIDATION").bold());
    println!("{}", separator());
    println!("  as of {}", style(&report.as_of).cyan());

    println!("\n{}ROW COUNTS:", CHART);
    for count in &report.table_counts {
        let icon = if count.rows > 0 { CHECK } else { CROSS };
        println!("  {}{}: {}", icon, count.table, count.rows);
    }

    let structural: Vec<&Finding> = report
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Hard && !f.check.ends_with("is non-empty"))
        .collect();
    println!("\n{}INTEGRITY:", LINK);
    for finding in structural {
        print_finding(finding);
    }

    println!("\n{}DISTRIBUTIONS:", CLOCK);
    for finding in report.findings.iter().filter(|f| f.severity != Severity::Hard) {
        if finding.check.ends_with("is non-empty") {
            continue;
        }
        print_finding(finding);
    }

    if !report.metrics.creation_by_weekday.is_empty() {
        println!("\n  Task creation by day of week:");
        for day in &report.metrics.creation_by_weekday {
            println!("    {}: {} ({:.1}%)", day.weekday, day.tasks, day.percent);
        }
    }

    println!("\n{}", separator());
    let violations: Vec<&Finding> = report.violations().collect();
    if violations.is_empty() {
        println!("{}{}", CHECK, style("PASS: all checks passed").green().bold());
    } else {
        println!("{}", style("ISSUES FOUND:").red().bold());
        for finding in &violations {
            println!("  {}{}: {}", CROSS, finding.check, finding.detail);
        }
        println!("\n{}{}", CROSS, style("FAIL").red().bold());
    }
    println!("{}", separator());
}
