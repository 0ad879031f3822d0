//! Terminal progress for a batch run.
//!
//! [`BatchProgress`] draws an `indicatif` bar over all units of work and
//! doubles as the run's [`LogSink`]: log lines are printed above the bar.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::logging::LogSink;
use crate::state_machine::{Cursor, RunState, RunSummary};

pub struct BatchProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl BatchProgress {
    pub fn start(total_units: usize) -> Self {
        let pb = ProgressBar::new(total_units as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Move the bar to `done` and describe the unit under `cursor`.
    pub fn update(&self, done: usize, cursor: Cursor, total_rows: usize, variations: u32) {
        self.pb.set_position(done as u64);
        if cursor.row_index <= total_rows {
            self.pb.set_message(format!(
                "row {}/{} (sheet row {}) - variation {}/{}",
                cursor.row_index,
                total_rows,
                cursor.row_index + 1,
                cursor.variation_index + 1,
                variations
            ));
        }
    }

    /// Clear the bar and print the final state.
    pub fn finish(&self, state: &RunState) {
        self.pb.finish_and_clear();
        match state {
            RunState::CompletedSuccessfully => {
                println!("  {} All rows completed", self.green.apply_to("✓"));
            }
            RunState::Aborted(reason) => {
                println!(
                    "  {} Run aborted ({reason}): the API quota is used up, finished files are kept",
                    self.red.apply_to("✗")
                );
            }
            other => {
                println!("  {} Run ended: {other}", self.yellow.apply_to("■"));
            }
        }
    }

    pub fn print_summary(&self, summary: &RunSummary) {
        let style = match summary.final_state {
            RunState::CompletedSuccessfully => &self.green,
            RunState::Aborted(_) => &self.red,
            _ => &self.yellow,
        };
        println!();
        println!("{}", style.apply_to("─── Run Summary ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(summary).unwrap_or_default()
        );
    }
}

impl LogSink for BatchProgress {
    fn line(&self, line: &str) {
        self.pb.println(line);
        tracing::debug!(target: "wavebatch::run", "{line}");
    }
}
