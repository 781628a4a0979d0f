//! Frame normalization orchestration.

use std::io::Write;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::calibration::common::error::{CalibrationError, Result};
use crate::calibration::config::CalibrationConfig;
use crate::calibration::dark_rows::DarkRowCompensator;
use crate::calibration::frame::{CalibratedFrame, RawFrame};
use crate::calibration::io::{AutoFrameReader, FrameReader, FrameWriter, TiffFrameWriter};
use crate::calibration::smoothing::{PostProcessor, WienerFilter};


/// Gain-normalizes a raw frame according to `config`.
///
/// Full raw frames come back cropped to the active image area.
#[instrument(skip(raw, config), fields(rows = raw.rows(), cols = raw.cols(), method = %config.method))]
pub fn normalize(raw: &RawFrame, config: &CalibrationConfig) -> Result<CalibratedFrame> {
    let compensator = DarkRowCompensator::new(config.method);
    let mut pixels = compensator.compensate(
        raw.to_f64().view(),
        config.target_level,
        !config.dark_rows_only,
    )?;

    if config.smooth {
        let filter = WienerFilter::default();
        let _span = tracing::info_span!("post_process", stage = filter.name()).entered();
        pixels = filter.process(pixels.view())?;
    }

    Ok(CalibratedFrame::new(pixels))
}

pub struct CalibrationPipeline<R: FrameReader, W: FrameWriter> {
    reader: R,
    writer: W,
    config: CalibrationConfig,
}

impl CalibrationPipeline<AutoFrameReader, TiffFrameWriter> {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            reader: AutoFrameReader,
            writer: TiffFrameWriter,
            config,
        }
    }
}

impl<R: FrameReader, W: FrameWriter> CalibrationPipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, config: CalibrationConfig) -> Self {
        Self {
            reader,
            writer,
            config,
        }
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(CalibrationError::InvalidDimensions(width, height));
        }

        Ok(())
    }

    /// Decodes, normalizes and encodes one frame, returning the normalized
    /// frame as well.
    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn calibrate(&self, input_data: &[u8], output: &mut dyn Write) -> Result<CalibratedFrame> {
        info!("Starting frame calibration");

        let raw = {
            let _span = tracing::info_span!("decode_frame").entered();
            self.reader.read_frame(input_data)?
        };
        debug!(bits_per_sample = raw.bits_per_sample, "Frame decoded");

        {
            let _span =
                tracing::info_span!("validate_dimensions", width = raw.cols(), height = raw.rows())
                    .entered();
            self.validate_dimensions(raw.cols(), raw.rows())?;
        }

        let calibrated = {
            let _span = tracing::info_span!("normalize").entered();
            normalize(&raw, &self.config)?
        };

        {
            let _span = tracing::info_span!("encode_tiff").entered();
            self.writer.write_frame(&calibrated, output, &self.config)?;
        }

        info!(
            width = calibrated.cols(),
            height = calibrated.rows(),
            "Calibration complete"
        );
        Ok(calibrated)
    }

    #[instrument(skip(self, input_path, output_path))]
    pub fn calibrate_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<CalibratedFrame> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Calibrating file"
        );

        let input_data = {
            let _span = tracing::info_span!("read_input_file").entered();
            std::fs::read(input_path).map_err(|e| {
                CalibrationError::InputReadError(format!("{}: {}", input_path.display(), e))
            })?
        };

        let mut output_file = {
            let _span = tracing::info_span!("create_output_file").entered();
            std::fs::File::create(output_path).map_err(|e| {
                CalibrationError::OutputWriteError(format!("{}: {}", output_path.display(), e))
            })?
        };

        self.calibrate(&input_data, &mut output_file)
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: CalibrationConfig) {
        self.config = config;
    }
}
