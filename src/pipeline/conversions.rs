//! Conversion orchestration

pub mod raw_to_rgb;

pub use raw_to_rgb::RawToRgbPipeline;
