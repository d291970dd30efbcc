//! Dataset validation: `worksim validate`.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use worksim::config::SimConfig;
use worksim::store::Store;
use worksim::temporal::parse_date;
use worksim::ui::print_validation_report;
use worksim::validate::validate_store;

use crate::ReportArgs;

/// `--as-of` when given, else the date of the configured reference time.
pub fn resolve_as_of(arg: Option<&str>, config: &SimConfig) -> Result<NaiveDate> {
    match arg {
        Some(raw) => parse_date(raw).with_context(|| format!("Invalid --as-of date: {}", raw)),
        None => Ok(config.reference_now()?.date()),
    }
}

/// Open `db` read-only, print the report, and return whether it passed.
pub fn validate_and_print(db: &Path, as_of: NaiveDate, json: bool) -> Result<bool> {
    let store = Store::open_read_only(db)?;
    let report = validate_store(&store, as_of)?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to encode report")?
        );
    } else {
        print_validation_report(&report);
    }
    Ok(report.passed)
}

pub fn cmd_validate(
    db: Option<&Path>,
    config_path: Option<&Path>,
    report: &ReportArgs,
) -> Result<bool> {
    let config = SimConfig::load(config_path)?;
    let db = db.unwrap_or(&config.output);
    let as_of = resolve_as_of(report.as_of.as_deref(), &config)?;
    validate_and_print(db, as_of, report.json)
}
