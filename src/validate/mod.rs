//! Read-only verification of a generated store.
//!
//! Every statistic is recomputed from the persisted rows; nothing is taken
//! from the generator. Invariant violations become findings in the report,
//! never errors. Errors are reserved for an unreadable store.

pub mod report;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::params;
use tracing::{debug, info};

use crate::models::{CustomFieldDefinition, FieldType, SectionName};
use crate::store::{Store, TABLES};
use crate::temporal::format_date;

pub use report::{
    CompletionRate, Finding, Metrics, Severity, TableCount, ValidationReport, WeekdayCount,
};

/// Tables that must hold at least one row.
pub const CORE_TABLES: [&str; 8] = [
    "organizations",
    "users",
    "teams",
    "team_memberships",
    "projects",
    "sections",
    "tasks",
    "custom_field_defs",
];

/// `(child table, foreign key column, parent table)`.
const FOREIGN_KEYS: [(&str, &str, &str); 21] = [
    ("users", "organization_id", "organizations"),
    ("teams", "organization_id", "organizations"),
    ("team_memberships", "team_id", "teams"),
    ("team_memberships", "user_id", "users"),
    ("projects", "team_id", "teams"),
    ("projects", "organization_id", "organizations"),
    ("sections", "project_id", "projects"),
    ("tasks", "project_id", "projects"),
    ("tasks", "section_id", "sections"),
    ("tasks", "assignee_id", "users"),
    ("subtasks", "parent_task_id", "tasks"),
    ("subtasks", "assignee_id", "users"),
    ("comments", "task_id", "tasks"),
    ("comments", "author_id", "users"),
    ("attachments", "task_id", "tasks"),
    ("attachments", "uploaded_by", "users"),
    ("task_tags", "task_id", "tasks"),
    ("task_tags", "tag_id", "tags"),
    ("custom_field_defs", "project_id", "projects"),
    ("custom_field_values", "custom_field_def_id", "custom_field_defs"),
    ("custom_field_values", "task_id", "tasks"),
];

const UNASSIGNED_BAND: (f64, f64) = (10.0, 20.0);
const OVERDUE_BAND: (f64, f64) = (3.0, 5.0);
const WEEKEND_DUE_CEILING: f64 = 20.0;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

fn percent(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn scalar(store: &Store, sql: &str) -> Result<i64> {
    store
        .conn()
        .query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("Validation query failed: {}", sql))
}

/// Run every check against `store`. Overdue status is measured at `as_of`.
pub fn validate_store(store: &Store, as_of: NaiveDate) -> Result<ValidationReport> {
    let mut findings = Vec::new();

    let table_counts = check_table_counts(store, &mut findings)?;
    check_referential_integrity(store, &mut findings)?;
    check_causal_ordering(store, as_of, &mut findings)?;
    check_uniqueness(store, &mut findings)?;
    check_sections(store, &mut findings)?;
    check_custom_field_values(store, &mut findings)?;
    let metrics = check_distributions(store, as_of, &mut findings)?;

    let report = ValidationReport::new(format_date(as_of), table_counts, metrics, findings);
    info!(
        passed = report.passed,
        violations = report.violations().count(),
        "Validation complete"
    );
    Ok(report)
}

fn check_table_counts(store: &Store, findings: &mut Vec<Finding>) -> Result<Vec<TableCount>> {
    let mut counts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        let rows = store.count_rows(table)?;
        let severity = if CORE_TABLES.contains(&table) {
            Severity::Hard
        } else {
            Severity::Warning
        };
        findings.push(Finding::new(
            format!("{} is non-empty", table),
            severity,
            rows > 0,
            format!("{} rows", rows),
        ));
        counts.push(TableCount {
            table: table.to_string(),
            rows,
        });
    }
    Ok(counts)
}

fn check_referential_integrity(store: &Store, findings: &mut Vec<Finding>) -> Result<()> {
    for (child, column, parent) in FOREIGN_KEYS {
        let sql = format!(
            "SELECT COUNT(*) FROM {child} c
             WHERE c.{column} IS NOT NULL
               AND NOT EXISTS (SELECT 1 FROM {parent} p WHERE p.id = c.{column})"
        );
        let dangling = scalar(store, &sql)?;
        debug!(child, column, dangling, "Foreign key check");
        findings.push(Finding::new(
            format!("{}.{} resolves to {}", child, column, parent),
            Severity::Hard,
            dangling == 0,
            format!("{} dangling", dangling),
        ));
    }
    Ok(())
}

fn check_causal_ordering(
    store: &Store,
    as_of: NaiveDate,
    findings: &mut Vec<Finding>,
) -> Result<()> {
    let as_of_text = format_date(as_of);
    for table in ["tasks", "subtasks"] {
        let sql = format!(
            "SELECT COUNT(*) FROM {table}
             WHERE completed = 1 AND (completed_at IS NULL OR completed_at < created_at)"
        );
        let violations = scalar(store, &sql)?;
        findings.push(Finding::new(
            format!("{} completed_at >= created_at", table),
            Severity::Hard,
            violations == 0,
            format!("{} violations", violations),
        ));

        // Timestamps are fixed-width text, so the date prefix compares as a date.
        let sql = format!(
            "SELECT COUNT(*) FROM {table}
             WHERE substr(created_at, 1, 10) > ?1
                OR (completed_at IS NOT NULL AND substr(completed_at, 1, 10) > ?1)"
        );
        let late: i64 = store
            .conn()
            .query_row(&sql, params![as_of_text], |row| row.get(0))
            .with_context(|| format!("Validation query failed: {}", sql))?;
        findings.push(Finding::new(
            format!("{} not created or completed after {}", table, as_of_text),
            Severity::Hard,
            late == 0,
            format!("{} rows past the as-of date", late),
        ));
    }

    let early = scalar(
        store,
        "SELECT COUNT(*) FROM subtasks s JOIN tasks t ON t.id = s.parent_task_id
         WHERE s.created_at < t.created_at",
    )?;
    findings.push(Finding::new(
        "subtasks created after parent",
        Severity::Hard,
        early == 0,
        format!("{} violations", early),
    ));
    Ok(())
}

fn check_uniqueness(store: &Store, findings: &mut Vec<Finding>) -> Result<()> {
    let pairs = [
        ("team_memberships", "team_id, user_id"),
        ("task_tags", "task_id, tag_id"),
    ];
    for (table, key) in pairs {
        let sql = format!(
            "SELECT COUNT(*) FROM (SELECT 1 FROM {table} GROUP BY {key} HAVING COUNT(*) > 1)"
        );
        let dupes = scalar(store, &sql)?;
        findings.push(Finding::new(
            format!("({}) unique in {}", key, table),
            Severity::Hard,
            dupes == 0,
            format!("{} duplicate pairs", dupes),
        ));
    }
    Ok(())
}

fn check_sections(store: &Store, findings: &mut Vec<Finding>) -> Result<()> {
    let canonical = SectionName::ORDERED
        .iter()
        .map(|s| format!("(s.position = {} AND s.name = '{}')", s.position(), s.as_str()))
        .collect::<Vec<_>>()
        .join(" OR ");
    let sql = format!(
        "SELECT COUNT(*) FROM projects p
         WHERE (SELECT COUNT(*) FROM sections s WHERE s.project_id = p.id) != {}
            OR EXISTS (SELECT 1 FROM sections s WHERE s.project_id = p.id AND NOT ({}))",
        SectionName::ORDERED.len(),
        canonical
    );
    let bad = scalar(store, &sql)?;
    findings.push(Finding::new(
        "projects have the five canonical sections",
        Severity::Hard,
        bad == 0,
        format!("{} projects off-pattern", bad),
    ));
    Ok(())
}

/// Whether `value` is acceptable for a field declared as `def`.
pub fn value_matches_definition(def: &CustomFieldDefinition, value: &str) -> bool {
    match def.field_type {
        FieldType::Enum => match &def.options {
            Some(options) if !options.is_empty() => options.iter().any(|o| o == value),
            _ => value == "N/A",
        },
        FieldType::Number => value.parse::<f64>().is_ok(),
        FieldType::Text => !value.is_empty(),
        FieldType::Other(_) => true,
    }
}

fn check_custom_field_values(store: &Store, findings: &mut Vec<Finding>) -> Result<()> {
    let defs: std::collections::HashMap<i64, CustomFieldDefinition> = store
        .list_custom_field_defs()?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();

    let mut stmt = store
        .conn()
        .prepare("SELECT custom_field_def_id, value FROM custom_field_values")
        .context("Failed to prepare custom field value scan")?;
    let rows = stmt
        .query_map(params![], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
        .context("Failed to scan custom field values")?;

    let mut mismatched = 0i64;
    for row in rows {
        let (def_id, value) = row.context("Failed to read custom field value")?;
        // Values whose definition is missing are counted as dangling references.
        if let Some(def) = defs.get(&def_id) {
            if !value_matches_definition(def, &value) {
                mismatched += 1;
            }
        }
    }

    findings.push(Finding::new(
        "custom field values match their definition",
        Severity::Hard,
        mismatched == 0,
        format!("{} mismatched", mismatched),
    ));
    Ok(())
}

fn check_distributions(
    store: &Store,
    as_of: NaiveDate,
    findings: &mut Vec<Finding>,
) -> Result<Metrics> {
    let conn = store.conn();
    let total_tasks = store.count_rows("tasks")?;

    let unassigned = scalar(store, "SELECT COUNT(*) FROM tasks WHERE assignee_id IS NULL")?;
    let unassigned_percent = percent(unassigned, total_tasks);
    findings.push(Finding::new(
        "unassigned tasks within 10-20%",
        Severity::Soft,
        (UNASSIGNED_BAND.0..=UNASSIGNED_BAND.1).contains(&unassigned_percent),
        format!(
            "{} / {} = {:.2}% (target 15%)",
            unassigned, total_tasks, unassigned_percent
        ),
    ));

    let mut completion_rates = Vec::new();
    {
        let mut stmt = conn
            .prepare(
                "SELECT p.project_type, COUNT(t.id), COALESCE(SUM(t.completed), 0)
                 FROM tasks t JOIN projects p ON p.id = t.project_id
                 GROUP BY p.project_type ORDER BY p.project_type",
            )
            .context("Failed to prepare completion rate query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .context("Failed to query completion rates")?;
        for row in rows {
            let (project_type, total, completed) = row.context("Failed to read completion row")?;
            let pct = percent(completed, total);
            findings.push(Finding::info(
                format!("{} completion rate", project_type),
                format!("{} / {} = {:.2}%", completed, total, pct),
            ));
            completion_rates.push(CompletionRate {
                project_type,
                completed,
                total,
                percent: pct,
            });
        }
    }

    let overdue_incomplete: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM tasks
             WHERE completed = 0 AND due_date IS NOT NULL AND due_date < ?1",
            params![format_date(as_of)],
            |row| row.get(0),
        )
        .context("Failed to count overdue tasks")?;
    let overdue_percent = percent(overdue_incomplete, total_tasks);
    findings.push(Finding::new(
        "overdue incomplete tasks present",
        Severity::Soft,
        overdue_incomplete > 0,
        format!("{} tasks ({:.2}%)", overdue_incomplete, overdue_percent),
    ));
    findings.push(Finding::new(
        "overdue incomplete tasks within 3-5%",
        Severity::Warning,
        (OVERDUE_BAND.0..=OVERDUE_BAND.1).contains(&overdue_percent),
        format!("{:.2}% of all tasks", overdue_percent),
    ));

    let with_due = scalar(store, "SELECT COUNT(*) FROM tasks WHERE due_date IS NOT NULL")?;
    let weekend_due = scalar(
        store,
        "SELECT COUNT(*) FROM tasks
         WHERE due_date IS NOT NULL AND strftime('%w', due_date) IN ('0', '6')",
    )?;
    let weekend_due_percent = percent(weekend_due, with_due);
    findings.push(Finding::new(
        "weekend due dates under 20%",
        Severity::Soft,
        weekend_due_percent < WEEKEND_DUE_CEILING,
        format!(
            "{} / {} = {:.2}% (target under 15%)",
            weekend_due, with_due, weekend_due_percent
        ),
    ));

    let archived_projects = scalar(store, "SELECT COUNT(*) FROM projects WHERE is_archived = 1")?;
    findings.push(Finding::new(
        "archived projects present",
        Severity::Warning,
        archived_projects > 0,
        format!("{} archived", archived_projects),
    ));

    let empty_sections = scalar(
        store,
        "SELECT COUNT(*) FROM sections s
         WHERE NOT EXISTS (SELECT 1 FROM tasks t WHERE t.section_id = s.id)",
    )?;
    findings.push(Finding::info(
        "empty sections",
        format!("{} sections without tasks", empty_sections),
    ));

    let mut creation_by_weekday = Vec::new();
    {
        let mut stmt = conn
            .prepare(
                "SELECT CAST(strftime('%w', created_at) AS INTEGER) AS dow, COUNT(*)
                 FROM tasks GROUP BY dow ORDER BY dow",
            )
            .context("Failed to prepare weekday query")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))
            .context("Failed to query weekday distribution")?;
        for row in rows {
            let (dow, tasks) = row.context("Failed to read weekday row")?;
            let weekday = WEEKDAYS
                .get(dow as usize)
                .copied()
                .unwrap_or("?")
                .to_string();
            creation_by_weekday.push(WeekdayCount {
                weekday,
                tasks,
                percent: percent(tasks, total_tasks),
            });
        }
    }

    Ok(Metrics {
        total_tasks,
        unassigned_percent,
        overdue_incomplete,
        overdue_percent,
        weekend_due_percent,
        archived_projects,
        empty_sections,
        completion_rates,
        creation_by_weekday,
    })
}
