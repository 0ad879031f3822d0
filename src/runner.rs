use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::BatchError;
use crate::gemini::SpeechSynthesizer;
use crate::logging::LogSink;
use crate::state_machine::{
    BatchJob, Cursor, GenerationOutcome, OutcomeCounts, RunEvent, RunState, RunSummary,
};
use crate::wav::wrap_as_wave;

/// Reason recorded in [`RunState::Aborted`] when the daily quota runs out.
pub const QUOTA_EXHAUSTED: &str = "quota_exhausted";

const EMPTY_AUDIO: &str = "empty audio data";

/// Characters of row text shown in the run log.
const LOG_PREVIEW_CHARS: usize = 10;

/// What the driver wants the run to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Run,
    Pause,
    Stop,
}

impl Control {
    /// Interactive command: `p` pauses, `r` resumes, `s` or `q` stops.
    pub fn from_command(input: &str) -> Option<Control> {
        match input.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" => Some(Control::Pause),
            "r" | "resume" => Some(Control::Run),
            "s" | "stop" | "q" | "quit" => Some(Control::Stop),
            _ => None,
        }
    }
}

/// Drives one [`BatchJob`] one unit of work at a time.
pub struct BatchRunner<S, L> {
    job: BatchJob,
    cursor: Cursor,
    state: RunState,
    synthesizer: S,
    log: L,
    counts: OutcomeCounts,
    fatal_error: Option<String>,
    run_id: String,
    started_at: DateTime<Utc>,
}

impl<S: SpeechSynthesizer, L: LogSink> BatchRunner<S, L> {
    /// A fresh runner: Idle, cursor on row 1 variation 0.
    pub fn new(job: BatchJob, synthesizer: S, log: L) -> Self {
        Self {
            job,
            cursor: Cursor::default(),
            state: RunState::Idle,
            synthesizer,
            log,
            counts: OutcomeCounts::default(),
            fatal_error: None,
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn job(&self) -> &BatchJob {
        &self.job
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Next unit of work.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// True once every (row, variation) pair has been visited.
    pub fn is_exhausted(&self) -> bool {
        self.cursor.row_index > self.job.total_rows()
    }

    /// `(units done, total units)`.
    pub fn progress(&self) -> (usize, usize) {
        let total = self.job.total_units();
        let done = self
            .cursor
            .completed_units(self.job.variations_per_row())
            .min(total);
        (done, total)
    }

    /// Snapshot of the run so far, including the abort message if any.
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::new(
            &self.run_id,
            &self.job,
            self.counts,
            self.state.clone(),
            self.cursor,
            self.started_at,
        );
        summary.fatal_error = self.fatal_error.clone();
        summary
    }

    fn transition(&mut self, event: RunEvent) -> Result<(), BatchError> {
        match self.state.apply(&event) {
            Some(next) => {
                debug!(run_id = %self.run_id, from = %self.state, to = %next, "run state changed");
                self.state = next;
                Ok(())
            }
            None => Err(BatchError::InvalidTransition {
                action: event.action(),
                state: self.state.clone(),
            }),
        }
    }

    /// Idle -> Running. Logs the size of the job and where files go.
    pub fn start(&mut self) -> Result<(), BatchError> {
        self.transition(RunEvent::Start)?;
        self.started_at = Utc::now();
        self.log.line(&format!(
            "Loaded {} valid rows (x{} variations = {} generations)",
            self.job.total_rows(),
            self.job.variations_per_row(),
            self.job.total_units()
        ));
        self.log.line(&format!(
            "Output directory: {}",
            self.job.output_directory().display()
        ));
        Ok(())
    }

    /// Running -> Paused. Takes effect between steps; a request in flight
    /// finishes first.
    pub fn pause(&mut self) -> Result<(), BatchError> {
        self.transition(RunEvent::Pause)?;
        self.log.line("Paused.");
        Ok(())
    }

    /// Paused -> Running, from the same cursor.
    pub fn resume(&mut self) -> Result<(), BatchError> {
        self.transition(RunEvent::Resume)?;
        self.log.line("Resuming...");
        Ok(())
    }

    /// Running or Paused -> Stopped. Terminal: a stopped runner cannot be
    /// restarted.
    pub fn stop(&mut self) -> Result<(), BatchError> {
        self.transition(RunEvent::Stop)?;
        self.log.line("Stopped by user.");
        Ok(())
    }

    /// Perform at most one unit of work.
    ///
    /// Returns `Ok(None)` once the cursor has passed the last row; the run is
    /// then complete. A fatal outcome aborts the run and leaves the cursor on
    /// the failed unit; every other outcome moves the cursor forward.
    pub async fn step(&mut self) -> Result<Option<GenerationOutcome>, BatchError> {
        if self.state != RunState::Running {
            return Err(BatchError::InvalidTransition {
                action: "step",
                state: self.state.clone(),
            });
        }

        let cursor = self.cursor;
        let unit = self
            .job
            .text_at(cursor.row_index)
            .map(str::to_owned)
            .zip(self.job.output_path(&cursor));
        let Some((text, path)) = unit else {
            self.transition(RunEvent::Exhaust)?;
            self.log.line("All done!");
            return Ok(None);
        };

        let preview: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
        self.log.line(&format!(
            "Generating ({}/{} - {}/{}): {preview}...",
            cursor.row_index,
            self.job.total_rows(),
            cursor.variation_index + 1,
            self.job.variations_per_row()
        ));

        let outcome = if path.exists() {
            self.log.line(&format!("Skip: {}", display_name(&path)));
            GenerationOutcome::Skipped
        } else {
            self.generate(&text, &path).await
        };

        if let GenerationOutcome::FailedFatal(message) = &outcome {
            self.fatal_error = Some(message.clone());
            self.log
                .line("Daily quota exceeded. No more audio can be generated in this period.");
            self.transition(RunEvent::Abort(QUOTA_EXHAUSTED.to_string()))?;
        } else {
            self.cursor.advance(self.job.variations_per_row());
        }
        self.counts.record(&outcome);
        debug!(
            run_id = %self.run_id,
            row = cursor.row_index,
            variation = cursor.variation_index,
            %outcome,
            "step finished"
        );
        Ok(Some(outcome))
    }

    async fn generate(&self, text: &str, path: &Path) -> GenerationOutcome {
        let name = display_name(path);
        match self.synthesizer.synthesize(text).await {
            Ok(audio) if audio.data.is_empty() => {
                self.log.line("Failed: audio data was empty");
                GenerationOutcome::FailedRecoverable(EMPTY_AUDIO.to_string())
            }
            Ok(audio) => {
                let wav = wrap_as_wave(&audio.data, &audio.mime_type);
                match write_atomically(path, &wav).await {
                    Ok(()) => {
                        self.log.line(&format!("Saved: {name}"));
                        GenerationOutcome::Saved
                    }
                    Err(e) => {
                        let message = format!("failed to write {name}: {e}");
                        warn!(run_id = %self.run_id, %message, "write failed");
                        self.log.line(&format!("Error: {message}"));
                        GenerationOutcome::FailedRecoverable(message)
                    }
                }
            }
            Err(e) => {
                let message = e.to_string();
                self.log.line(&format!("Error: {message}"));
                if e.is_quota_exhausted() {
                    GenerationOutcome::FailedFatal(message)
                } else {
                    warn!(run_id = %self.run_id, file = %name, error = %message, "generation failed");
                    GenerationOutcome::FailedRecoverable(message)
                }
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Write through a sibling `.part` file so a half-written WAV never counts
/// as done. A failed write leaves nothing behind.
async fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let result = match tokio::fs::write(&partial, bytes).await {
        Ok(()) => tokio::fs::rename(&partial, path).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    result
}

/// Run `runner` until it completes, aborts or is stopped.
///
/// `control` is read only between steps. After every step the driver waits
/// `delay`; only [`Control::Stop`] cuts that wait short. `on_step` sees the
/// runner after start and after every step.
pub async fn drive<S, L, F>(
    runner: &mut BatchRunner<S, L>,
    mut control: watch::Receiver<Control>,
    delay: Duration,
    mut on_step: F,
) -> Result<RunSummary, BatchError>
where
    S: SpeechSynthesizer,
    L: LogSink,
    F: FnMut(&BatchRunner<S, L>),
{
    if *runner.state() == RunState::Idle {
        runner.start()?;
    }
    on_step(runner);

    loop {
        let requested = *control.borrow_and_update();
        match (requested, runner.state().clone()) {
            (Control::Stop, _) => {
                runner.stop()?;
                break;
            }
            (Control::Pause, RunState::Running) => runner.pause()?,
            (Control::Run, RunState::Paused) => runner.resume()?,
            _ => {}
        }

        if *runner.state() == RunState::Paused {
            if control.changed().await.is_err() {
                // Nobody is left to resume us.
                runner.stop()?;
                break;
            }
            continue;
        }

        runner.step().await?;
        on_step(runner);
        if runner.state().is_terminal() {
            break;
        }

        if !runner.is_exhausted() {
            throttle(delay, &mut control).await;
        }
    }

    Ok(runner.summary())
}

async fn throttle(delay: Duration, control: &mut watch::Receiver<Control>) {
    let deadline = Instant::now() + delay;
    loop {
        tokio::select! {
            _ = sleep_until(deadline) => return,
            changed = control.changed() => {
                if changed.is_err() {
                    sleep_until(deadline).await;
                    return;
                }
                if *control.borrow() == Control::Stop {
                    return;
                }
            }
        }
    }
}
