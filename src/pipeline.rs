//! Demand-driven scanline pipeline
//!
//! Sensor-mosaic image data flows to interpolated RGB scanlines through a
//! chain of stages, each consuming and producing one scanline range at a
//! time instead of materializing whole images. A terminal consumer first
//! declares its row demand bottom-up through the chain (stages widen the
//! range by their vertical context needs), then pulls data forward with
//! compute calls into caller-supplied buffers.

pub mod cache;
pub mod common;
pub mod conversions;
pub mod demosaic;
pub mod descriptor;
pub mod fetch;
pub mod raw;
pub mod source;
pub mod stage;
pub mod tiff;
pub mod transform;


pub use common::{PipelineError, Result};

pub use descriptor::{ImageDescriptor, Metadata, MosaicPattern, RowPhase};

pub use stage::Stage;

pub use cache::ScanlineCacheStage;
pub use demosaic::{BilinearDemosaicStage, MalvarDemosaicStage};
pub use fetch::FetchWindow;
pub use source::BufferSource;
pub use transform::{MatrixStage, ScaleStage};

pub use raw::RawLoaderSource;
pub use tiff::{ConversionConfig, ConversionConfigBuilder, DemosaicAlgorithm, TiffCompression, TiffSink};

pub use conversions::RawToRgbPipeline;
