//! Command line interface.
//!
//! [`Cli`] carries the global flags (`--config`, `--verbose`) and one
//! [`Command`]: `run` generates audio, `scan` only reports what would run.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::MAX_VARIATIONS;

/// Generate speech WAV files from the rows of a spreadsheet.
#[derive(Debug, Parser)]
#[command(name = "wavebatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file to use instead of ./wavebatch.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug diagnostics on stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate audio for every row of the spreadsheet.
    Run {
        /// Workbook to read (xlsx, xls, xlsb or ods).
        spreadsheet: PathBuf,

        /// Generations per row.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_VARIATIONS as i64))]
        variations: Option<u32>,

        /// Column holding the text (letters like C, or a 0-based number).
        #[arg(long)]
        column: Option<String>,

        /// Write into this directory; reusing one resumes an earlier run.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Seconds to wait between requests.
        #[arg(long)]
        delay_secs: Option<u64>,
    },

    /// Count usable rows and list the files a run would produce.
    Scan {
        spreadsheet: PathBuf,

        /// Column holding the text (letters like C, or a 0-based number).
        #[arg(long)]
        column: Option<String>,

        /// Generations per row.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_VARIATIONS as i64))]
        variations: Option<u32>,
    },
}
