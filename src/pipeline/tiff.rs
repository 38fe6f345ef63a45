//! TIFF encoding collaborator and conversion configuration

pub mod sink;
pub mod types;

pub use sink::TiffSink;
pub use types::{ConversionConfig, ConversionConfigBuilder, DemosaicAlgorithm, TiffCompression};
