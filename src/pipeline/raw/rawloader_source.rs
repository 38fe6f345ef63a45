//! RAW decoder stage built on the rawloader library.
//!
//! Decodes any format rawloader understands (ARW, CR2, NEF, DNG, ...),
//! normalizes the sensor samples to linear floats and publishes the sensor
//! geometry (masked margins, crop offsets, mosaic pattern) as the chain's
//! root descriptor.

use std::io::Cursor;
use std::path::Path;

use rawloader::RawImageData;
use tracing::debug;

use crate::pipeline::common::error::{PipelineError, Result};
use crate::pipeline::descriptor::{ImageDescriptor, Metadata};
use crate::pipeline::stage::{check_range, check_request, Stage};

pub struct RawLoaderSource {
    descriptor: ImageDescriptor,
    data: Vec<f32>,
}

impl RawLoaderSource {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| PipelineError::InputReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(&bytes)
    }

    /// Decodes a RAW file from memory.
    ///
    /// Samples are normalized to `(v - black) / (white - black)`, clamped at
    /// zero so masked-pixel noise below the black level cannot go negative.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        debug!("Decoding RAW image, {} bytes", bytes.len());

        let decoded = rawloader::decode(&mut Cursor::new(bytes))
            .map_err(|e| PipelineError::DecodeError(e.to_string()))?;

        if decoded.cpp != 1 {
            return Err(PipelineError::DecodeError(format!(
                "expected single-component mosaic data, got {} components per pixel",
                decoded.cpp
            )));
        }

        let width = decoded.width;
        let height = decoded.height;
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidDimensions(width, height));
        }

        let black = decoded.blacklevels[0] as f32;
        let white = decoded.whitelevels[0] as f32;
        let range = (white - black).max(1.0);

        let data: Vec<f32> = match &decoded.data {
            RawImageData::Integer(values) => values
                .iter()
                .map(|&v| ((v as f32 - black) / range).max(0.0))
                .collect(),
            RawImageData::Float(values) => values
                .iter()
                .map(|&v| ((v - black) / range).max(0.0))
                .collect(),
        };

        let pattern = decoded.cfa.name.parse()?;

        // rawloader crop order: top, right, bottom, left.
        let [top, right, bottom, left] = decoded.crops;
        if top + bottom >= height || left + right >= width {
            return Err(PipelineError::InvalidDimensions(width, height));
        }

        let descriptor = ImageDescriptor {
            buffer_width: width,
            buffer_height: height,
            buffer_channels: 1,
            image_width: width - left - right,
            image_height: height - top - bottom,
            left_offset: left,
            top_offset: top,
            mosaic_pattern: Some(pattern),
            metadata: Metadata {
                camera_make: decoded.clean_make.clone(),
                camera_model: decoded.clean_model.clone(),
                wb_coeffs: decoded.wb_coeffs,
                // rawloader does not expose exposure metadata.
                iso: 0.0,
                shutter: 0.0,
                aperture: 0.0,
            },
        };

        debug!(
            "Decoded {}x{} {:?} mosaic, image region {}x{} at ({}, {})",
            width,
            height,
            pattern,
            descriptor.image_width,
            descriptor.image_height,
            left,
            top
        );

        Ok(RawLoaderSource { descriptor, data })
    }
}

impl Stage for RawLoaderSource {
    fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    fn declare_demand(&mut self, first_line: usize, last_line: usize) -> Result<()> {
        // Everything is already decoded; the demand phase is only a hint.
        check_range(&self.descriptor, first_line, last_line)
    }

    fn compute(&mut self, first_line: usize, last_line: usize, out: &mut [f32]) -> Result<()> {
        check_request(&self.descriptor, first_line, last_line, out.len())?;

        let stride = self.descriptor.stride();
        out.copy_from_slice(&self.data[first_line * stride..(last_line + 1) * stride]);
        Ok(())
    }
}
