use std::io::Cursor;

use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tracing::debug;

use crate::calibration::common::error::{CalibrationError, Result};
use crate::calibration::frame::RawFrame;
use crate::calibration::io::FrameReader;

/// Reads single-channel 8 or 16 bit TIFF frames.
pub struct TiffFrameReader;

fn decode_error(e: tiff::TiffError) -> CalibrationError {
    CalibrationError::DecodeError(e.to_string())
}

impl FrameReader for TiffFrameReader {
    fn read_frame(&self, data: &[u8]) -> Result<RawFrame> {
        debug!("Decoding TIFF frame, {} bytes", data.len());

        let mut decoder = Decoder::new(Cursor::new(data)).map_err(decode_error)?;
        let (width, height) = decoder.dimensions().map_err(decode_error)?;
        let bits_per_sample = match decoder.colortype().map_err(decode_error)? {
            ColorType::Gray(bits) => u32::from(bits),
            other => {
                return Err(CalibrationError::DecodeError(format!(
                    "expected a grayscale frame, found {other:?}"
                )));
            }
        };

        let samples = match decoder.read_image().map_err(decode_error)? {
            DecodingResult::U16(values) => values,
            DecodingResult::U8(values) => values.into_iter().map(u16::from).collect(),
            _ => {
                return Err(CalibrationError::DecodeError(
                    "unsupported TIFF sample type".to_string(),
                ));
            }
        };
        debug!(width, height, bits_per_sample, "Decoded TIFF frame");

        RawFrame::from_samples(height as usize, width as usize, samples, bits_per_sample)
    }
}
