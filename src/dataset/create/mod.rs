//! Creation context before a run and result handling after it.

mod input;
mod output;


pub use input::{CACHE_DATASET_SUBPATH, CACHE_SCRATCH_SUBPATH, CreateInput};
pub use output::{CreateOutput, ProcessedResult, process_result};
