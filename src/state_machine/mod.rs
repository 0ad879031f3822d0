mod job;
mod state;

pub use job::{
    output_file_name, BatchJob, Cursor, GenerationOutcome, OutcomeCounts, RunSummary,
};
pub use state::{RunEvent, RunState};
