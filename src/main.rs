use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use daystar_calib_rs::calibration::{
    AutoFrameReader, CalibratedFrame, CalibrationConfig, CalibrationError, CalibrationPipeline,
    FrameReader, FrameWriter, SampleFormat, TiffFrameWriter, WindowRequest,
    WindowedBackgroundSubtractor, normalize,
};
use daystar_calib_rs::logger::{self, info, warn};

#[derive(Parser)]
#[command(name = "daystar-calib")]
#[command(version, about = "DayStar two-half sensor calibration", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gain-normalize a raw frame and write it as TIFF
    Normalize {
        /// Raw frame (TIFF or headerless u16 dump)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output TIFF
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Column estimator (mean, median, mode, robust-mean, blended)
        #[arg(short, long, value_name = "METHOD", default_value = "robust-mean")]
        method: String,

        /// Output level; derived from the frame when omitted
        #[arg(short, long, value_name = "LEVEL")]
        target: Option<f64>,

        /// Skip the self-referenced pass after dark-row compensation
        #[arg(long)]
        dark_rows_only: bool,

        /// Apply a 3x3 Wiener filter to the result
        #[arg(long)]
        smooth: bool,

        /// Write 32-bit float samples instead of rounded 16-bit counts
        #[arg(long)]
        float: bool,
    },

    /// Calibrate a frame and cut out a background-subtracted window
    Window {
        /// Raw frame (TIFF or headerless u16 dump)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Window center column
        #[arg(long)]
        x: f64,

        /// Window center row
        #[arg(long)]
        y: f64,

        /// Half width before scaling
        #[arg(long)]
        width: usize,

        /// Half height before scaling
        #[arg(long)]
        height: usize,

        /// Multiplier applied to the half extents
        #[arg(long, default_value = "1.5")]
        scale: f64,

        /// Clipping threshold for the background estimate
        #[arg(long, default_value = "2.0")]
        sigma: f64,

        /// Keep negative values after subtraction
        #[arg(long)]
        allow_negative: bool,

        /// Write the window as a float TIFF
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_with_default(if cli.verbose { "debug" } else { "info" });

    match cli.command {
        Commands::Normalize {
            input,
            output,
            method,
            target,
            dark_rows_only,
            smooth,
            float,
        } => {
            let config = CalibrationConfig::builder()
                .method_name(&method)
                .target_level(target)
                .dark_rows_only(dark_rows_only)
                .smooth(smooth)
                .sample_format(if float {
                    SampleFormat::Gray32Float
                } else {
                    SampleFormat::Gray16
                })
                .build();
            info!(method = %config.method, "Normalization configured");

            let pipeline = CalibrationPipeline::new(config);
            let frame = pipeline
                .calibrate_file(&input, &output)
                .with_context(|| format!("calibrating {}", input.display()))?;
            info!(
                rows = frame.rows(),
                cols = frame.cols(),
                output = %output.display(),
                "Normalization successful"
            );
        }
        Commands::Window {
            input,
            x,
            y,
            width,
            height,
            scale,
            sigma,
            allow_negative,
            output,
        } => {
            let data = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let raw = AutoFrameReader.read_frame(&data)?;
            let calibrated = normalize(&raw, &CalibrationConfig::default())?;

            let request = WindowRequest::new((x, y), (width, height))
                .with_scale(scale)
                .with_sigma(sigma)
                .with_allow_negative(allow_negative);
            let frame = calibrated.pixels.view();
            let extraction = match WindowedBackgroundSubtractor::extract(frame, &request) {
                Ok(extraction) => extraction,
                Err(CalibrationError::InsufficientContext(reason)) => {
                    warn!(%reason, "Local background unavailable, subtracting the global level");
                    WindowedBackgroundSubtractor::extract_global(frame, &request)?
                }
                Err(e) => return Err(e.into()),
            };

            let (rows, cols) = extraction.subimage.dim();
            info!(
                rows,
                cols,
                offset = ?extraction.offset,
                local_center = ?extraction.local_center,
                "Window extracted"
            );

            if let Some(path) = output {
                let config = CalibrationConfig::builder()
                    .sample_format(SampleFormat::Gray32Float)
                    .build();
                let mut file = std::fs::File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                TiffFrameWriter.write_frame(
                    &CalibratedFrame::new(extraction.subimage),
                    &mut file,
                    &config,
                )?;
                info!(output = %path.display(), "Window written");
            }
        }
    }

    Ok(())
}
