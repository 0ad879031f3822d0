use std::path::PathBuf;

use thiserror::Error;

use crate::state_machine::RunState;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("No valid data rows found (the text column is empty or holds only a header)")]
    EmptyDataset,

    #[error("Daily quota exhausted, run aborted: {0}")]
    QuotaExhausted(String),

    #[error("Cannot {action} while the run is {state}")]
    InvalidTransition { action: &'static str, state: RunState },

    #[error("Output directory does not exist: {}", .0.display())]
    MissingOutputDirectory(PathBuf),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
