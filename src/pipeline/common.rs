//! Shared error and result types for the pipeline

pub mod error;

pub use error::{PipelineError, Result};
