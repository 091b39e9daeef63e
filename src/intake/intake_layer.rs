// Intake layer - callers of the tagger that live outside the core.

#[path = "batch.rs"]
pub mod batch;

pub use batch::{run_batch, BatchSummary};
