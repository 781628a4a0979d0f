//! DayStar frame calibration
//!
//! The sensor is read out as two independent halves, each with its own bank
//! of column amplifiers and a band of optically dark rows next to the split.
//! This module removes per-column gain and per-half level differences from
//! raw frames, subtracts local backgrounds around targets, and reads and
//! writes frames as TIFF.

pub mod arith;
pub mod background;
pub mod common;
pub mod config;
pub mod dark_rows;
pub mod frame;
pub mod gain;
pub mod geometry;
pub mod halves;
pub mod io;
pub mod pipeline;
pub mod smoothing;
pub mod stats;
pub mod subtraction;

pub use common::{CalibrationError, Result};

pub use arith::{ClampedSub, subtract_clamped};

pub use background::{WindowBounds, WindowExtraction, WindowRequest, WindowedBackgroundSubtractor};

pub use config::{CalibrationConfig, CalibrationConfigBuilder, SampleFormat, TiffCompression};

pub use dark_rows::DarkRowCompensator;

pub use frame::{CalibratedFrame, RawFrame};

pub use gain::{ColumnGainNormalizer, GainProfile};

pub use geometry::{FrameLayout, SENSOR_REGION, SensorGeometry, SensorRegion};

pub use halves::{ColumnSource, normalize_halves};

pub use io::{AutoFrameReader, DatFrameReader, FrameReader, FrameWriter, TiffFrameReader, TiffFrameWriter};

pub use pipeline::{CalibrationPipeline, normalize};

pub use smoothing::{PostProcessor, WienerFilter};

pub use stats::{MethodSelection, NormalizationMethod, RobustEstimate, select_method};

pub use subtraction::{subtract_column_means, subtract_dark_rows};
