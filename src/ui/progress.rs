use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::synth::PhaseObserver;
use crate::ui::icons::{CHECK, CROSS, SPARKLE};

/// Terminal progress for a generation run, rendered via `indicatif`.
///
/// Two bars are stacked vertically:
/// - Phase bar: how many of the pipeline phases have finished
/// - Step spinner: the phase currently running
///
/// Milestone lines are printed above the bars, or straight to stdout when
/// the bars are hidden (no terminal).
pub struct GenerationUi {
    multi: MultiProgress,
    phase_bar: ProgressBar,
    step_bar: ProgressBar,
}

impl GenerationUi {
    pub fn new(total_phases: u64) -> Self {
        let multi = MultiProgress::new();

        let phase_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let phase_bar = multi.add(ProgressBar::new(total_phases));
        phase_bar.set_style(phase_style);
        phase_bar.set_prefix("Phases");

        let step_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg} {elapsed:.dim}")
            .expect("progress bar template is a valid static string");

        let step_bar = multi.add(ProgressBar::new_spinner());
        step_bar.set_style(step_style);
        step_bar.set_prefix("  Step");

        Self {
            multi,
            phase_bar,
            step_bar,
        }
    }

    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.is_hidden() || self.multi.println(msg.as_ref()).is_err() {
            println!("{}", msg.as_ref());
        }
    }

    pub fn print_header(&self, users: u32, teams: u32, seed: u64) {
        self.print_line(format!("{}", style("═".repeat(60)).cyan()));
        self.print_line(format!("{}", style("WORKSIM DATA GENERATOR").bold()));
        self.print_line(format!("{}", style("═".repeat(60)).cyan()));
        self.print_line(format!(
            "Target: {} users, {} teams, seed={}",
            style(users).cyan(),
            style(teams).cyan(),
            style(seed).cyan()
        ));
    }

    pub fn print_notice(&self, msg: &str) {
        self.print_line(format!("{}", style(msg).dim()));
    }

    /// Clear both bars and print the closing line.
    pub fn finish(&self, elapsed_secs: f64) {
        self.step_bar.finish_and_clear();
        self.phase_bar.finish_and_clear();
        self.print_line(format!(
            "\n{} Generation complete in {:.1}s",
            SPARKLE, elapsed_secs
        ));
    }

    pub fn fail(&self, reason: &str) {
        self.step_bar.finish_and_clear();
        self.phase_bar.abandon();
        self.print_line(format!(
            "\n{} Generation failed: {}",
            CROSS,
            style(reason).red()
        ));
    }
}

impl PhaseObserver for GenerationUi {
    fn phase_started(&self, index: usize, total: usize, label: &str) {
        self.print_line(format!(
            "\n{} {}...",
            style(format!("[{}/{}]", index, total)).yellow().bold(),
            label
        ));
        self.phase_bar.set_message(label.to_string());
        self.step_bar.set_message(label.to_string());
        self.step_bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn phase_finished(&self, _index: usize, detail: &str) {
        self.step_bar.disable_steady_tick();
        self.phase_bar.inc(1);
        self.print_line(format!("  {} {}", CHECK, style(detail).green()));
    }
}
