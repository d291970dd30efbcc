use serde::Serialize;

/// How a failed finding affects the verdict.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Structural invariant. Any violation fails the run.
    Hard,
    /// Distribution target. Out of band fails the run.
    Soft,
    /// Reported, never fails the run.
    Warning,
    /// Statistic with no target.
    Info,
}

impl Severity {
    pub fn fails_verdict(&self) -> bool {
        matches!(self, Self::Hard | Self::Soft)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub check: String,
    pub severity: Severity,
    pub passed: bool,
    pub detail: String,
}

impl Finding {
    pub fn new(
        check: impl Into<String>,
        severity: Severity,
        passed: bool,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            check: check.into(),
            severity,
            passed,
            detail: detail.into(),
        }
    }

    pub fn info(check: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(check, Severity::Info, true, detail)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableCount {
    pub table: String,
    pub rows: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRate {
    pub project_type: String,
    pub completed: i64,
    pub total: i64,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekdayCount {
    pub weekday: String,
    pub tasks: i64,
    pub percent: f64,
}

/// Recomputed distribution statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metrics {
    pub total_tasks: i64,
    pub unassigned_percent: f64,
    pub overdue_incomplete: i64,
    pub overdue_percent: f64,
    pub weekend_due_percent: f64,
    pub archived_projects: i64,
    pub empty_sections: i64,
    pub completion_rates: Vec<CompletionRate>,
    pub creation_by_weekday: Vec<WeekdayCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// Date overdue status was measured against.
    pub as_of: String,
    pub table_counts: Vec<TableCount>,
    pub metrics: Metrics,
    pub findings: Vec<Finding>,
    pub passed: bool,
}

impl ValidationReport {
    pub fn new(
        as_of: String,
        table_counts: Vec<TableCount>,
        metrics: Metrics,
        findings: Vec<Finding>,
    ) -> Self {
        let passed = findings
            .iter()
            .all(|f| f.passed || !f.severity.fails_verdict());
        Self {
            as_of,
            table_counts,
            metrics,
            findings,
            passed,
        }
    }

    /// Findings that fail the verdict.
    pub fn violations(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| !f.passed && f.severity.fails_verdict())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| !f.passed && f.severity == Severity::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(findings: Vec<Finding>) -> ValidationReport {
        ValidationReport::new("2025-06-18".into(), vec![], Metrics::default(), findings)
    }

    #[test]
    fn warnings_do_not_fail_the_verdict() {
        let r = report(vec![
            Finding::new("archived projects", Severity::Warning, false, "0 archived"),
            Finding::info("empty sections", "12"),
        ]);
        assert!(r.passed);
        assert_eq!(r.warnings().count(), 1);
        assert_eq!(r.violations().count(), 0);
    }

    #[test]
    fn soft_and_hard_failures_fail_the_verdict() {
        let soft = report(vec![Finding::new("unassigned", Severity::Soft, false, "31%")]);
        assert!(!soft.passed);
        let hard = report(vec![Finding::new("dangling", Severity::Hard, false, "3")]);
        assert!(!hard.passed);
        assert_eq!(hard.violations().next().map(|f| f.check.as_str()), Some("dangling"));
    }

    #[test]
    fn report_serializes_with_snake_case_severity() {
        let r = report(vec![Finding::new("x", Severity::Hard, true, "ok")]);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["findings"][0]["severity"], "hard");
        assert_eq!(json["passed"], true);
    }
}
