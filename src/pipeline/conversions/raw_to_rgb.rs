use std::io::Write;
use std::path::Path;

use tracing::{info, instrument};

use crate::pipeline::cache::ScanlineCacheStage;
use crate::pipeline::common::error::{PipelineError, Result};
use crate::pipeline::demosaic::{BilinearDemosaicStage, MalvarDemosaicStage};
use crate::pipeline::raw::RawLoaderSource;
use crate::pipeline::stage::Stage;
use crate::pipeline::tiff::{ConversionConfig, DemosaicAlgorithm, TiffSink};
use crate::pipeline::transform::{MatrixStage, ScaleStage};

/// Assembles decoder -> scanline cache -> demosaic -> color transforms ->
/// TIFF sink and drives the two-phase protocol over the whole image.
pub struct RawToRgbPipeline {
    config: ConversionConfig,
}

impl RawToRgbPipeline {
    pub fn new(config: ConversionConfig) -> Self {
        RawToRgbPipeline { config }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    fn build_chain<T: Stage + 'static>(&self, source: T) -> Result<impl Stage + use<T>> {
        let cache = ScanlineCacheStage::new(source);

        let demosaic: Box<dyn Stage> = match self.config.demosaic {
            DemosaicAlgorithm::Bilinear => Box::new(BilinearDemosaicStage::new(cache)?),
            DemosaicAlgorithm::Malvar => Box::new(MalvarDemosaicStage::new(cache)?),
        };

        let colored: Box<dyn Stage> = match self.config.matrix {
            Some(matrix) => Box::new(MatrixStage::new(demosaic, matrix)?),
            None => demosaic,
        };

        Ok(ScaleStage::new(colored, self.config.exposure))
    }

    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn convert(&self, input_data: &[u8], output: &mut dyn Write) -> Result<()> {
        info!("Starting RAW to RGB conversion");

        let source = {
            let _span = tracing::info_span!("decode_raw").entered();
            RawLoaderSource::from_bytes(input_data)?
        };

        let info = source.descriptor().clone();

        let chain = {
            let _span = tracing::info_span!("build_chain").entered();
            self.build_chain(source)?
        };

        {
            let _span = tracing::info_span!("encode_tiff").entered();
            let mut sink = TiffSink::new(chain, &self.config)?;
            sink.write(output)?;
        }

        info!(
            width = info.image_width,
            height = info.image_height,
            camera = %format!("{} {}", info.metadata.camera_make, info.metadata.camera_model),
            "Conversion complete"
        );
        Ok(())
    }

    #[instrument(skip(self, input_path, output_path))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<()> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Converting file"
        );

        let input_data = {
            let _span = tracing::info_span!("read_input_file").entered();
            std::fs::read(input_path).map_err(|e| {
                PipelineError::InputReadError(format!("{}: {}", input_path.display(), e))
            })?
        };

        let mut output_file = {
            let _span = tracing::info_span!("create_output_file").entered();
            std::fs::File::create(output_path).map_err(|e| {
                PipelineError::OutputWriteError(format!("{}: {}", output_path.display(), e))
            })?
        };

        self.convert(&input_data, &mut output_file)
    }
}
