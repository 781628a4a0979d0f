//! Headerless sample dumps.
//!
//! A dump is the bare row-major readout as little-endian `u16`. Its shape is
//! inferred from the byte count, so only the full raw and cropped layouts
//! are accepted.

use rayon::prelude::*;
use tracing::debug;

use crate::calibration::common::error::{CalibrationError, Result};
use crate::calibration::frame::RawFrame;
use crate::calibration::geometry::FrameLayout;
use crate::calibration::io::FrameReader;

pub struct DatFrameReader;

/// Bit depth reported when the frame is entirely zero.
const DEFAULT_BITS_PER_SAMPLE: u32 = 16;

const U16_BITS: u32 = 16;

impl FrameReader for DatFrameReader {
    fn read_frame(&self, data: &[u8]) -> Result<RawFrame> {
        debug!("Decoding sample dump, {} bytes", data.len());

        let layout = [FrameLayout::FullRaw, FrameLayout::Cropped]
            .into_iter()
            .find(|layout| {
                let (rows, cols) = layout.dimensions();
                rows * cols * 2 == data.len()
            })
            .ok_or_else(|| {
                CalibrationError::DecodeError(format!(
                    "{} bytes does not match a known frame layout",
                    data.len()
                ))
            })?;
        let (rows, cols) = layout.dimensions();

        let samples: Vec<u16> = data
            .par_chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        let max_value = samples.iter().max().copied().unwrap_or(0);
        let bits_per_sample = if max_value == 0 {
            DEFAULT_BITS_PER_SAMPLE
        } else {
            U16_BITS - max_value.leading_zeros()
        };
        debug!(?layout, bits_per_sample, max_value, "Decoded sample dump");

        RawFrame::from_samples(rows, cols, samples, bits_per_sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::geometry::{CROPPED_COLS, CROPPED_ROWS, FULL_COLS, FULL_ROWS};

    fn dump(rows: usize, cols: usize, value: impl Fn(usize) -> u16) -> Vec<u8> {
        (0..rows * cols).flat_map(|i| value(i).to_le_bytes()).collect()
    }

    #[test]
    fn test_full_raw_dump() {
        let bytes = dump(FULL_ROWS, FULL_COLS, |i| (i % 4096) as u16);
        let frame = DatFrameReader.read_frame(&bytes).unwrap();
        assert_eq!((frame.rows(), frame.cols()), (FULL_ROWS, FULL_COLS));
        assert_eq!(frame.bits_per_sample, 12);
        assert_eq!(frame.pixels[[0, 5]], 5);
        assert_eq!(frame.pixels[[1, 0]], (FULL_COLS % 4096) as u16);
    }

    #[test]
    fn test_cropped_dump() {
        let bytes = dump(CROPPED_ROWS, CROPPED_COLS, |_| 0);
        let frame = DatFrameReader.read_frame(&bytes).unwrap();
        assert_eq!(frame.layout().unwrap(), FrameLayout::Cropped);
        assert_eq!(frame.bits_per_sample, DEFAULT_BITS_PER_SAMPLE);
    }

    #[test]
    fn test_unknown_length_rejected() {
        assert!(matches!(
            DatFrameReader.read_frame(&[0u8; 10]),
            Err(CalibrationError::DecodeError(_))
        ));
    }
}
