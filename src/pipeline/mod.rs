//! Analysis → interpretation → confirmation → generation → write

mod orchestrator;
mod report;

pub use orchestrator::{Pipeline, RunOptions};
pub use report::GenerationReport;
