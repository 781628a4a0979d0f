use std::io::Write;

use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder, colortype};
use tracing::debug;

use crate::calibration::common::error::{CalibrationError, Result};
use crate::calibration::config::{CalibrationConfig, SampleFormat, TiffCompression};
use crate::calibration::frame::CalibratedFrame;
use crate::calibration::io::FrameWriter;

pub struct TiffFrameWriter;

fn encode_error(e: tiff::TiffError) -> CalibrationError {
    CalibrationError::EncodeError(e.to_string())
}

impl FrameWriter for TiffFrameWriter {
    fn write_frame(
        &self,
        frame: &CalibratedFrame,
        output: &mut dyn Write,
        config: &CalibrationConfig,
    ) -> Result<()> {
        let width = frame.cols() as u32;
        let height = frame.rows() as u32;
        debug!(width, height, format = ?config.sample_format, "Encoding TIFF frame");

        let mut buffer = Vec::new();

        let compression = match config.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        };

        let mut encoder = TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(encode_error)?
            .with_compression(compression);

        match config.sample_format {
            SampleFormat::Gray16 => {
                if let Some(predictor_val) = config.predictor {
                    let predictor = match predictor_val {
                        2 => tiff::tags::Predictor::Horizontal,
                        _ => tiff::tags::Predictor::None,
                    };
                    encoder = encoder.with_predictor(predictor);
                }
                let data: Vec<u16> = frame.to_u16().into_iter().collect();
                encoder
                    .write_image::<colortype::Gray16>(width, height, &data)
                    .map_err(encode_error)?;
            }
            SampleFormat::Gray32Float => {
                if config.predictor.is_some() {
                    debug!("Predictor ignored for floating point output");
                }
                let data: Vec<f32> = frame.pixels.iter().map(|&v| v as f32).collect();
                encoder
                    .write_image::<colortype::Gray32Float>(width, height, &data)
                    .map_err(encode_error)?;
            }
        }

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete");
        Ok(())
    }
}
