use tracing::debug;

use crate::calibration::common::error::Result;
use crate::calibration::frame::RawFrame;
use crate::calibration::io::{DatFrameReader, TiffFrameReader};

pub trait FrameReader {
    fn read_frame(&self, data: &[u8]) -> Result<RawFrame>;
}

/// Picks the TIFF or headerless reader from the buffer's leading bytes.
pub struct AutoFrameReader;

impl AutoFrameReader {
    pub fn is_tiff(data: &[u8]) -> bool {
        data.starts_with(b"II*\0") || data.starts_with(b"MM\0*")
    }
}

impl FrameReader for AutoFrameReader {
    fn read_frame(&self, data: &[u8]) -> Result<RawFrame> {
        if Self::is_tiff(data) {
            debug!("Detected TIFF input");
            TiffFrameReader.read_frame(data)
        } else {
            debug!("No TIFF header, reading as raw samples");
            DatFrameReader.read_frame(data)
        }
    }
}
