//! TIFF scanline sink
//!
//! The terminal consumer of a 3-channel chain. It drives the two-phase
//! protocol: demand is declared chunk by chunk for the whole image region
//! before any compute call (declarations mirror the compute calls so that
//! margin widening above a cache stage balances out), then scanlines are
//! pulled in the same chunks, cropped to the image region and encoded as
//! RGB16.

use std::io::Write;

use tracing::debug;

use crate::pipeline::common::error::{PipelineError, Result};
use crate::pipeline::stage::Stage;
use crate::pipeline::tiff::types::{ConversionConfig, TiffCompression};

pub struct TiffSink<S: Stage> {
    upstream: S,
    compression: TiffCompression,
    chunk_rows: usize,
}

impl<S: Stage> TiffSink<S> {
    pub fn new(upstream: S, config: &ConversionConfig) -> Result<Self> {
        let channels = upstream.descriptor().buffer_channels;
        if channels != 3 {
            return Err(PipelineError::ChannelMismatch {
                expected: 3,
                actual: channels,
            });
        }
        Ok(TiffSink {
            upstream,
            compression: config.compression,
            chunk_rows: config.chunk_rows.max(1),
        })
    }

    /// Row ranges the sink will pull, covering the image region.
    fn chunks(&self) -> Vec<(usize, usize)> {
        let info = self.upstream.descriptor();
        let first = info.top_offset;
        let last = info.top_offset + info.image_height - 1;

        let mut chunks = Vec::new();
        let mut start = first;
        while start <= last {
            let end = (start + self.chunk_rows - 1).min(last);
            chunks.push((start, end));
            start = end + 1;
        }
        chunks
    }

    /// Pulls the whole image region through the chain and encodes it.
    pub fn write(&mut self, output: &mut dyn Write) -> Result<()> {
        let info = self.upstream.descriptor().clone();
        let stride = info.stride();
        let width = info.image_width;
        let height = info.image_height;

        debug!("Encoding TIFF image: {}x{}", width, height);

        let chunks = self.chunks();
        for &(first, last) in &chunks {
            self.upstream.declare_demand(first, last)?;
        }

        // Crop the image region out of each buffer row and quantize.
        let mut pixels: Vec<u16> = Vec::with_capacity(width * height * 3);
        let mut scratch = vec![0.0f32; self.chunk_rows * stride];
        for &(first, last) in &chunks {
            let rows = last - first + 1;
            let chunk = &mut scratch[..rows * stride];
            self.upstream.compute(first, last, chunk)?;

            for row in chunk.chunks_exact(stride) {
                let image_row = &row[info.left_offset * 3..(info.left_offset + width) * 3];
                pixels.extend(
                    image_row
                        .iter()
                        .map(|&v| (v * 65535.0).clamp(0.0, 65535.0) as u16),
                );
            }
        }

        let compression = match self.compression {
            TiffCompression::None => tiff::encoder::Compression::Uncompressed,
            TiffCompression::Lzw => tiff::encoder::Compression::Lzw,
            TiffCompression::DeflateFast => tiff::encoder::Compression::Deflate(
                tiff::encoder::compression::DeflateLevel::Fast,
            ),
            TiffCompression::DeflateBalanced => tiff::encoder::Compression::Deflate(
                tiff::encoder::compression::DeflateLevel::Balanced,
            ),
            TiffCompression::DeflateBest => tiff::encoder::Compression::Deflate(
                tiff::encoder::compression::DeflateLevel::Best,
            ),
        };

        let mut buffer = Vec::new();
        let mut encoder = tiff::encoder::TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(|e| PipelineError::EncodeError(e.to_string()))?
            .with_compression(compression);

        encoder
            .write_image::<tiff::encoder::colortype::RGB16>(width as u32, height as u32, &pixels)
            .map_err(|e| PipelineError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete");
        Ok(())
    }
}
