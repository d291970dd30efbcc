//! CLI command implementations.
//!
//! | Module     | Commands handled      |
//! |------------|-----------------------|
//! | `generate` | `Generate`, `Run`     |
//! | `validate` | `Validate`, `Run`     |

pub mod generate;
pub mod validate;

pub use generate::cmd_generate;
pub use validate::cmd_validate;

use anyhow::Result;

use crate::{GenerateArgs, ReportArgs};

/// Generate, then validate the freshly written store.
///
/// Overdue status is measured against the generation's reference date
/// unless `--as-of` says otherwise.
pub async fn cmd_run(generate: &GenerateArgs, report: &ReportArgs) -> Result<bool> {
    let config = cmd_generate(generate).await?;
    let as_of = validate::resolve_as_of(report.as_of.as_deref(), &config)?;
    validate::validate_and_print(&config.output, as_of, report.json)
}
