//! Frame reading and writing
//!
//! Readers decode a byte buffer into a `RawFrame`; writers encode a
//! `CalibratedFrame` as a grayscale TIFF.

mod dat_reader;
mod reader;
mod tiff_reader;
mod tiff_writer;
mod writer;

pub use dat_reader::DatFrameReader;
pub use reader::{AutoFrameReader, FrameReader};
pub use tiff_reader::TiffFrameReader;
pub use tiff_writer::TiffFrameWriter;
pub use writer::FrameWriter;
