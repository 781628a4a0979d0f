use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Unsupported frame shape: rows={rows}, cols={cols}")]
    UnsupportedShape { rows: usize, cols: usize },

    #[error("Cannot estimate on an empty region: {0}")]
    EmptyRegion(String),

    #[error("Insufficient context for background estimate: {0}")]
    InsufficientContext(String),

    #[error("Position ({x}, {y}) lies outside a {width}x{height} frame")]
    OutOfBounds {
        x: f64,
        y: f64,
        width: usize,
        height: usize,
    },

    #[error("Window scale must be finite and non-negative, got {0}")]
    InvalidScale(f64),

    #[error("Unknown normalization method: {0}")]
    UnknownMethod(String),

    #[error("Column {column} estimate is unusable for gain correction: {value}")]
    DegenerateColumn { column: usize, value: f64 },

    #[error("Target level must be finite and positive, got {0}")]
    InvalidTarget(f64),

    #[error("{half} sensor half has unusable mean level {mean}")]
    DegenerateHalf { half: &'static str, mean: f64 },

    #[error("Gain profile has {actual} factors but the frame has {expected} columns")]
    ProfileMismatch { expected: usize, actual: usize },

    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode frame: {0}")]
    DecodeError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CalibrationError>;
