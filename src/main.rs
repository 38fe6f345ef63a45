use rawscan_rs::logger;
use rawscan_rs::pipeline::{ConversionConfig, DemosaicAlgorithm, RawToRgbPipeline, TiffCompression};

use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    logger::init();

    let mut args = std::env::args().skip(1);
    let input = args.next().unwrap_or_else(|| "input.arw".to_string());
    let output = args.next().unwrap_or_else(|| "output.tiff".to_string());

    let config = ConversionConfig::builder()
        .compression(TiffCompression::None)
        .demosaic(DemosaicAlgorithm::Malvar)
        .build();
    let pipeline = RawToRgbPipeline::new(config);

    info!("RAW to RGB pipeline initialized");
    info!("Compression: {:?}", pipeline.config().compression);
    info!("Demosaic: {:?}", pipeline.config().demosaic);

    match pipeline.convert_file(&input, &output) {
        Ok(_) => info!("Conversion successful!"),
        Err(e) => error!("Conversion failed: {}", e),
    }

    Ok(())
}
