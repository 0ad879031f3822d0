use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::RunState;
use crate::error::BatchError;

/// Characters of row text that feed the file name.
const FILE_NAME_TEXT_CHARS: usize = 10;

/// Result of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationOutcome {
    /// The output file already existed.
    Skipped,
    /// Audio was generated and written.
    Saved,
    /// The unit is consumed; the run continues.
    FailedRecoverable(String),
    /// The run is aborted; the unit stays pending.
    FailedFatal(String),
}

impl std::fmt::Display for GenerationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationOutcome::Skipped => write!(f, "skipped"),
            GenerationOutcome::Saved => write!(f, "saved"),
            GenerationOutcome::FailedRecoverable(msg) => write!(f, "failed: {msg}"),
            GenerationOutcome::FailedFatal(msg) => write!(f, "fatal: {msg}"),
        }
    }
}

/// Progress pointer over a [`BatchJob`].
///
/// `row_index` is 1-based; `total_rows + 1` means every row is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub row_index: usize,
    pub variation_index: u32,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            row_index: 1,
            variation_index: 0,
        }
    }
}

impl Cursor {
    /// Move to the next (row, variation) pair.
    pub fn advance(&mut self, variations_per_row: u32) {
        self.variation_index += 1;
        if self.variation_index >= variations_per_row {
            self.variation_index = 0;
            self.row_index += 1;
        }
    }

    /// Units of work before this position.
    pub fn completed_units(&self, variations_per_row: u32) -> usize {
        (self.row_index - 1) * variations_per_row as usize + self.variation_index as usize
    }
}

/// Everything a run needs to know about its input and output.
#[derive(Debug, Clone)]
pub struct BatchJob {
    rows: Vec<String>,
    variations_per_row: u32,
    output_directory: PathBuf,
}

impl BatchJob {
    /// Validate the inputs of a run. Fails on an empty row list, zero
    /// variations, or an output directory that does not exist.
    pub fn new(
        rows: Vec<String>,
        variations_per_row: u32,
        output_directory: PathBuf,
    ) -> Result<Self, BatchError> {
        if rows.is_empty() {
            return Err(BatchError::EmptyDataset);
        }
        if variations_per_row == 0 {
            return Err(BatchError::Config(
                "variations per row must be at least 1".into(),
            ));
        }
        if !output_directory.is_dir() {
            return Err(BatchError::MissingOutputDirectory(output_directory));
        }
        Ok(Self {
            rows,
            variations_per_row,
            output_directory,
        })
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn variations_per_row(&self) -> u32 {
        self.variations_per_row
    }

    /// Rows times variations.
    pub fn total_units(&self) -> usize {
        self.rows.len() * self.variations_per_row as usize
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Text of the 1-based data row `row_index`.
    pub fn text_at(&self, row_index: usize) -> Option<&str> {
        row_index
            .checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .map(String::as_str)
    }

    /// File name for the unit under `cursor`, or `None` past the last row.
    pub fn file_name(&self, cursor: &Cursor) -> Option<String> {
        let text = self.text_at(cursor.row_index)?;
        Some(output_file_name(
            cursor.row_index,
            text,
            cursor.variation_index,
            self.variations_per_row,
        ))
    }

    pub fn output_path(&self, cursor: &Cursor) -> Option<PathBuf> {
        self.file_name(cursor)
            .map(|name| self.output_directory.join(name))
    }
}

/// `{row}_{prefix}{suffix}.wav`, where `prefix` is the alphanumeric part of
/// the first ten characters and `suffix` is `_v{n}` only for multi-variation
/// jobs.
pub fn output_file_name(
    row_index: usize,
    text: &str,
    variation_index: u32,
    variations_per_row: u32,
) -> String {
    let prefix: String = text
        .chars()
        .take(FILE_NAME_TEXT_CHARS)
        .filter(|c| c.is_alphanumeric())
        .collect();
    let suffix = if variations_per_row > 1 {
        format!("_v{}", variation_index + 1)
    } else {
        String::new()
    };
    format!("{row_index}_{prefix}{suffix}.wav")
}

/// Per-outcome counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: &GenerationOutcome) {
        match outcome {
            GenerationOutcome::Saved => self.saved += 1,
            GenerationOutcome::Skipped => self.skipped += 1,
            GenerationOutcome::FailedRecoverable(_) | GenerationOutcome::FailedFatal(_) => {
                self.failed += 1
            }
        }
    }
}

/// Structured record of a run, printed when the run ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub output_directory: PathBuf,
    pub total_rows: usize,
    pub variations_per_row: u32,
    pub total_units: usize,
    pub counts: OutcomeCounts,
    pub final_state: RunState,
    pub cursor: Cursor,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
    /// Message of the failure that aborted the run, if one did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,
}

impl RunSummary {
    pub fn new(
        run_id: &str,
        job: &BatchJob,
        counts: OutcomeCounts,
        final_state: RunState,
        cursor: Cursor,
        started_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.to_string(),
            output_directory: job.output_directory.clone(),
            total_rows: job.total_rows(),
            variations_per_row: job.variations_per_row,
            total_units: job.total_units(),
            counts,
            final_state,
            cursor,
            started_at,
            completed_at: now,
            duration_ms: (now - started_at).num_milliseconds(),
            fatal_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn file_name_strips_punctuation_from_prefix() {
        assert_eq!(output_file_name(5, "Hello, World! 123", 0, 1), "5_HelloWor.wav");
    }

    #[test]
    fn file_name_adds_variation_suffix_only_for_multiple() {
        assert_eq!(output_file_name(1, "abc", 0, 2), "1_abc_v1.wav");
        assert_eq!(output_file_name(1, "abc", 1, 2), "1_abc_v2.wav");
        assert_eq!(output_file_name(1, "abc", 0, 1), "1_abc.wav");
    }

    #[test]
    fn file_name_keeps_unicode_alphanumerics() {
        assert_eq!(output_file_name(2, "こんにちは、世界！", 0, 1), "2_こんにちは世界.wav");
        assert_eq!(output_file_name(3, "!!!", 0, 1), "3_.wav");
    }

    #[test]
    fn cursor_walks_rows_and_variations() {
        let mut c = Cursor::default();
        assert_eq!((c.row_index, c.variation_index), (1, 0));
        c.advance(2);
        assert_eq!((c.row_index, c.variation_index), (1, 1));
        c.advance(2);
        assert_eq!((c.row_index, c.variation_index), (2, 0));
        assert_eq!(c.completed_units(2), 2);

        let mut single = Cursor::default();
        single.advance(1);
        assert_eq!((single.row_index, single.variation_index), (2, 0));
    }

    #[test]
    fn job_rejects_empty_rows() {
        let dir = tempfile::tempdir().unwrap();
        let err = BatchJob::new(Vec::new(), 1, dir.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, BatchError::EmptyDataset));
    }

    #[test]
    fn job_rejects_missing_directory_and_zero_variations() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = BatchJob::new(rows(&["a"]), 1, missing).unwrap_err();
        assert!(matches!(err, BatchError::MissingOutputDirectory(_)));

        let err = BatchJob::new(rows(&["a"]), 0, dir.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, BatchError::Config(_)));
    }

    #[test]
    fn job_resolves_paths_by_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let job = BatchJob::new(rows(&["first", "second"]), 3, dir.path().to_path_buf()).unwrap();
        assert_eq!(job.total_units(), 6);
        assert_eq!(job.text_at(2), Some("second"));
        assert_eq!(job.text_at(0), None);

        let cursor = Cursor {
            row_index: 2,
            variation_index: 2,
        };
        assert_eq!(
            job.output_path(&cursor).unwrap(),
            dir.path().join("2_second_v3.wav")
        );
        let done = Cursor {
            row_index: 3,
            variation_index: 0,
        };
        assert_eq!(job.file_name(&done), None);
    }

    #[test]
    fn counts_group_failures() {
        let mut counts = OutcomeCounts::default();
        counts.record(&GenerationOutcome::Saved);
        counts.record(&GenerationOutcome::Skipped);
        counts.record(&GenerationOutcome::FailedRecoverable("x".into()));
        counts.record(&GenerationOutcome::FailedFatal("y".into()));
        assert_eq!(
            counts,
            OutcomeCounts {
                saved: 1,
                skipped: 1,
                failed: 2
            }
        );
    }

    #[test]
    fn summary_serializes_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let job = BatchJob::new(rows(&["a"]), 1, dir.path().to_path_buf()).unwrap();
        let summary = RunSummary::new(
            "run-1",
            &job,
            OutcomeCounts::default(),
            RunState::CompletedSuccessfully,
            Cursor {
                row_index: 2,
                variation_index: 0,
            },
            Utc::now(),
        );
        let json = serde_json::to_string(&summary).unwrap();
        let parsed: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run_id, "run-1");
        assert_eq!(parsed.total_units, 1);
        assert_eq!(parsed.final_state, RunState::CompletedSuccessfully);
        assert!(parsed.duration_ms >= 0);
        assert!(parsed.fatal_error.is_none());
        assert!(!json.contains("fatal_error"));
    }
}
