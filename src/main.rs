mod cli;
mod config;
mod error;
mod gemini;
mod logging;
mod rows;
mod runner;
mod state_machine;
mod ui;
mod wav;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use cli::{Cli, Command};
use config::BatchConfig;
use error::BatchError;
use gemini::GeminiClient;
use logging::{LogSink, TracingSink};
use rows::{SpreadsheetRows, column_index, prescan};
use runner::{BatchRunner, Control, drive};
use state_machine::{BatchJob, Cursor, RunState, output_file_name};
use ui::BatchProgress;

/// Exit status after a second Ctrl-C (128 + SIGINT).
const FORCED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => BatchConfig::load_from(path)?,
        None => BatchConfig::load()?,
    };

    match cli.command {
        Command::Run {
            spreadsheet,
            variations,
            column,
            output_dir,
            delay_secs,
        } => {
            if let Some(v) = variations {
                config.variations = v;
            }
            if let Some(c) = column {
                config.text_column = c;
            }
            if let Some(d) = delay_secs {
                config.request_delay_secs = d;
            }
            run(&config, &spreadsheet, output_dir).await
        }
        Command::Scan {
            spreadsheet,
            column,
            variations,
        } => {
            if let Some(c) = column {
                config.text_column = c;
            }
            if let Some(v) = variations {
                config.variations = v;
            }
            scan(&config, &spreadsheet)
        }
    }
}

fn read_rows(config: &BatchConfig, spreadsheet: &Path) -> Result<Vec<String>> {
    let column = column_index(&config.text_column).map_err(BatchError::Config)?;
    let source = SpreadsheetRows::open(spreadsheet, column)?;
    Ok(prescan(&source)?)
}

/// Explicit directories are reused as-is; otherwise a fresh timestamped one.
fn prepare_output_dir(config: &BatchConfig, explicit: Option<PathBuf>) -> Result<PathBuf> {
    let dir = explicit.unwrap_or_else(|| {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        config.output_root.join(format!("output_{stamp}"))
    });
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir)
}

async fn run(config: &BatchConfig, spreadsheet: &Path, output_dir: Option<PathBuf>) -> Result<()> {
    config.validate()?;
    config.require_api_key()?;

    let rows = read_rows(config, spreadsheet)?;
    let output_dir = prepare_output_dir(config, output_dir)?;
    let job = BatchJob::new(rows, config.variations, output_dir)?;
    info!(
        rows = job.total_rows(),
        variations = job.variations_per_row(),
        model = %config.model,
        "starting batch"
    );

    let client = GeminiClient::from_config(config)?;
    let delay = Duration::from_secs(config.request_delay_secs);
    let interactive = console::user_attended();
    let control = spawn_controls(interactive);

    let summary = if interactive {
        let progress = BatchProgress::start(job.total_units());
        progress.line("Type p + Enter to pause, r to resume, s to stop (Ctrl-C also stops).");
        let mut runner = BatchRunner::new(job, client, &progress);
        let summary = drive(&mut runner, control, delay, |r| {
            let (done, _) = r.progress();
            progress.update(
                done,
                r.cursor(),
                r.job().total_rows(),
                r.job().variations_per_row(),
            );
        })
        .await?;
        progress.finish(&summary.final_state);
        progress.print_summary(&summary);
        summary
    } else {
        let mut runner = BatchRunner::new(job, client, TracingSink);
        let summary = drive(&mut runner, control, delay, |_| {}).await?;
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).unwrap_or_default()
        );
        summary
    };

    if let RunState::Aborted(reason) = summary.final_state {
        let message = summary.fatal_error.unwrap_or(reason);
        return Err(BatchError::QuotaExhausted(message).into());
    }
    Ok(())
}

/// Ctrl-C always stops; an attended terminal can also pause and resume
/// through stdin.
fn spawn_controls(interactive: bool) -> watch::Receiver<Control> {
    let (tx, rx) = watch::channel(Control::Run);
    let tx = Arc::new(tx);

    // First Ctrl-C stops after the current request; a second one quits now.
    let on_signal = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        let _ = on_signal.send(Control::Stop);
        warn!("stopping after the current request; press Ctrl-C again to quit now");
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(FORCED_EXIT_CODE);
        }
    });

    // Blocking stdin reads live on their own thread so they never hold up
    // runtime shutdown.
    if interactive {
        std::thread::spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if let Some(control) = Control::from_command(&line) {
                    let _ = tx.send(control);
                }
            }
        });
    }

    rx
}

fn scan(config: &BatchConfig, spreadsheet: &Path) -> Result<()> {
    config.validate()?;
    let rows = read_rows(config, spreadsheet)?;
    println!(
        "{} valid rows x {} variations = {} generations",
        rows.len(),
        config.variations,
        rows.len() * config.variations as usize
    );

    let mut cursor = Cursor::default();
    while let Some(text) = rows.get(cursor.row_index - 1) {
        println!(
            "  {}",
            output_file_name(cursor.row_index, text, cursor.variation_index, config.variations)
        );
        cursor.advance(config.variations);
    }
    Ok(())
}
