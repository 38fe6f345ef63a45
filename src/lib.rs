pub mod logger;
pub mod pipeline;

pub use pipeline::{PipelineError, Result};
