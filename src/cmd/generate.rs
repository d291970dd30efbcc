//! Dataset generation: `worksim generate`.

use anyhow::{Context, Result};
use tracing::info;

use worksim::config::{ConfigOverrides, SimConfig};
use worksim::content::select_source;
use worksim::store::Store;
use worksim::synth::{PHASES, run_generation};
use worksim::ui::{GenerationUi, print_generation_summary};

use crate::GenerateArgs;

/// Build the merged config, replace any existing store and run every phase.
///
/// Returns the effective config so `run` can validate the same store.
pub async fn cmd_generate(args: &GenerateArgs) -> Result<SimConfig> {
    let mut config = SimConfig::load(args.config.as_deref())?;
    config.apply_overrides(&ConfigOverrides::from(args));
    config.validate()?;

    // Pin the reference time so generation and a following validation agree.
    if config.now.is_none() {
        config.now = Some(worksim::temporal::format_timestamp(config.reference_now()?));
    }

    let ui = GenerationUi::new(PHASES.len() as u64);
    ui.print_header(config.users, config.teams, config.seed);

    if let Some(parent) = config
        .output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create output directory {}", parent.display())
        })?;
    }
    if config.output.exists() {
        ui.print_notice(&format!(
            "Removing existing store at {}",
            config.output.display()
        ));
        std::fs::remove_file(&config.output).with_context(|| {
            format!("Failed to remove existing store {}", config.output.display())
        })?;
    }

    let store = Store::create(&config.output)?;
    let content = select_source(&config)?;

    let summary = match run_generation(&store, &config, content.as_ref(), &ui).await {
        Ok(summary) => summary,
        Err(e) => {
            ui.fail(&e.to_string());
            return Err(e.into());
        }
    };
    ui.finish(summary.elapsed_secs);

    let counts = store.table_counts()?;
    drop(store);
    let size = std::fs::metadata(&config.output)
        .map(|m| m.len())
        .unwrap_or(0);
    print_generation_summary(&summary, &counts, size);
    info!(output = %config.output.display(), size_bytes = size, "Store written");

    Ok(config)
}
