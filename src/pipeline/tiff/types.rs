//! Conversion configuration types

/// TIFF compression methods
#[derive(Debug, Clone, Copy)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression (slow, good compression)
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - best compression (slower)
    DeflateBest,
    /// Deflate compression - balanced
    DeflateBalanced,
}

/// Which pixel-reconstruction kernel the chain uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemosaicAlgorithm {
    /// Plain neighbor averaging, one row of context.
    Bilinear,
    /// Edge-aware Malvar-He-Cutler, two rows of context.
    Malvar,
}

/// Configuration for RAW to RGB TIFF conversion
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Compression method for the output TIFF
    pub compression: TiffCompression,
    /// Demosaicing kernel
    pub demosaic: DemosaicAlgorithm,
    /// Scanlines pulled through the chain per compute call
    pub chunk_rows: usize,
    /// Color matrix applied after demosaicing, if any
    pub matrix: Option<[[f32; 3]; 3]>,
    /// Uniform exposure multiplier applied last
    pub exposure: f32,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::None,
            demosaic: DemosaicAlgorithm::Malvar,
            chunk_rows: 64,
            matrix: None,
            exposure: 1.0,
        }
    }
}

impl ConversionConfig {
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder::default()
    }
}

/// Builder for ConversionConfig
#[derive(Default)]
pub struct ConversionConfigBuilder {
    compression: Option<TiffCompression>,
    demosaic: Option<DemosaicAlgorithm>,
    chunk_rows: Option<usize>,
    matrix: Option<Option<[[f32; 3]; 3]>>,
    exposure: Option<f32>,
}

impl ConversionConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn demosaic(mut self, demosaic: DemosaicAlgorithm) -> Self {
        self.demosaic = Some(demosaic);
        self
    }

    pub fn chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = Some(chunk_rows);
        self
    }

    pub fn matrix(mut self, matrix: Option<[[f32; 3]; 3]>) -> Self {
        self.matrix = Some(matrix);
        self
    }

    pub fn exposure(mut self, exposure: f32) -> Self {
        self.exposure = Some(exposure);
        self
    }

    pub fn build(self) -> ConversionConfig {
        let default = ConversionConfig::default();
        ConversionConfig {
            compression: self.compression.unwrap_or(default.compression),
            demosaic: self.demosaic.unwrap_or(default.demosaic),
            chunk_rows: self.chunk_rows.unwrap_or(default.chunk_rows).max(1),
            matrix: self.matrix.unwrap_or(default.matrix),
            exposure: self.exposure.unwrap_or(default.exposure),
        }
    }
}
