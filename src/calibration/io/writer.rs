use std::io::Write;

use crate::calibration::common::error::Result;
use crate::calibration::config::CalibrationConfig;
use crate::calibration::frame::CalibratedFrame;

pub trait FrameWriter {
    fn write_frame(
        &self,
        frame: &CalibratedFrame,
        output: &mut dyn Write,
        config: &CalibrationConfig,
    ) -> Result<()>;
}
