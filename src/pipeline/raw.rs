//! RAW decoding collaborator
//!
//! The decoder sits at the top of the chain as a terminal producer: it
//! publishes a complete descriptor at construction and serves normalized
//! mosaic scanlines for any row range, with or without a prior demand
//! declaration.

pub mod rawloader_source;

pub use rawloader_source::RawLoaderSource;
