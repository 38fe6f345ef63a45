//! Image geometry and metadata carried between pipeline stages

use std::str::FromStr;

use crate::pipeline::common::error::{PipelineError, Result};

/// The repeating 2x2 arrangement of single-color sensor sites.
///
/// Only the four Bayer arrangements are recognized; anything else is a
/// configuration error at construction time, never a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MosaicPattern {
    Rggb,
    Grbg,
    Bggr,
    Gbrg,
}

/// Color layout of one mosaic row: which of the four 2x2-cell phases the
/// row starts with at column 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPhase {
    /// Even columns sample red, odd columns sample green.
    RedGreen,
    /// Even columns sample green (in a red row), odd columns sample red.
    GreenRed,
    /// Even columns sample blue, odd columns sample green.
    BlueGreen,
    /// Even columns sample green (in a blue row), odd columns sample blue.
    GreenBlue,
}

impl MosaicPattern {
    /// Phase of the given row index. The phase toggles between the two rows
    /// of the 2x2 cell as the row parity changes.
    pub fn row_phase(&self, line: usize) -> RowPhase {
        let even = line & 1 == 0;
        match (self, even) {
            (MosaicPattern::Rggb, true) => RowPhase::RedGreen,
            (MosaicPattern::Rggb, false) => RowPhase::GreenBlue,
            (MosaicPattern::Grbg, true) => RowPhase::GreenRed,
            (MosaicPattern::Grbg, false) => RowPhase::BlueGreen,
            (MosaicPattern::Bggr, true) => RowPhase::BlueGreen,
            (MosaicPattern::Bggr, false) => RowPhase::GreenRed,
            (MosaicPattern::Gbrg, true) => RowPhase::GreenBlue,
            (MosaicPattern::Gbrg, false) => RowPhase::RedGreen,
        }
    }
}

impl FromStr for MosaicPattern {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RGGB" => Ok(MosaicPattern::Rggb),
            "GRBG" => Ok(MosaicPattern::Grbg),
            "BGGR" => Ok(MosaicPattern::Bggr),
            "GBRG" => Ok(MosaicPattern::Gbrg),
            other => Err(PipelineError::UnsupportedPattern(other.to_string())),
        }
    }
}

/// Camera metadata decoded alongside the sensor data. The pipeline core
/// passes this through untouched; only the color-science collaborators
/// interpret it.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub camera_make: String,
    pub camera_model: String,
    /// White balance multipliers as shot, RGBE order.
    pub wb_coeffs: [f32; 4],
    pub iso: f32,
    pub shutter: f32,
    pub aperture: f32,
}

/// Describes the geometry and semantics of one stage's output.
///
/// The buffer is the physical storage a scanline occupies; the image is the
/// visually meaningful sub-region within it (sensors carry masked margins).
/// A stage that changes channel count or dimensions publishes a new
/// descriptor at construction time and never mutates it during compute.
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    pub buffer_width: usize,
    pub buffer_height: usize,
    pub buffer_channels: usize,

    pub image_width: usize,
    pub image_height: usize,

    pub left_offset: usize,
    pub top_offset: usize,

    /// Defined only while the data is still in mosaic form.
    pub mosaic_pattern: Option<MosaicPattern>,

    pub metadata: Metadata,
}

impl ImageDescriptor {
    /// Samples per scanline at this stage's stride.
    pub fn stride(&self) -> usize {
        self.buffer_width * self.buffer_channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_parses_the_four_bayer_arrangements() {
        assert_eq!("RGGB".parse::<MosaicPattern>().unwrap(), MosaicPattern::Rggb);
        assert_eq!("GRBG".parse::<MosaicPattern>().unwrap(), MosaicPattern::Grbg);
        assert_eq!("BGGR".parse::<MosaicPattern>().unwrap(), MosaicPattern::Bggr);
        assert_eq!("GBRG".parse::<MosaicPattern>().unwrap(), MosaicPattern::Gbrg);
    }

    #[test]
    fn unknown_pattern_is_rejected() {
        let err = "XTRANS".parse::<MosaicPattern>().unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedPattern(_)));
    }

    #[test]
    fn row_phase_toggles_with_row_parity() {
        assert_eq!(MosaicPattern::Rggb.row_phase(0), RowPhase::RedGreen);
        assert_eq!(MosaicPattern::Rggb.row_phase(1), RowPhase::GreenBlue);
        assert_eq!(MosaicPattern::Rggb.row_phase(2), RowPhase::RedGreen);
        assert_eq!(MosaicPattern::Bggr.row_phase(0), RowPhase::BlueGreen);
        assert_eq!(MosaicPattern::Bggr.row_phase(1), RowPhase::GreenRed);
    }
}
