// THEORY:
// This file is the main entry point for the `coin_vision` library crate. It
// exports the `CoinPipeline` and its data structures (`PipelineConfig`,
// `FrameReport`, `Coin`, ...) as the high-level interface, while the individual
// stages stay reachable under `core_modules` for callers and tests that want to
// drive them one by one:
//
// - `bitmap`:        the owned, stride-addressed pixel buffer
// - `netpbm`:        PBM/PGM/PPM codec
// - `transforms`:    grayscale, thresholds, blur, morphology
// - `segmentation`:  the fixed frame-to-mask recipe
// - `blob_detector`: iterative flood-fill labelling and region measurement
// - `classifier`:    area-to-denomination mapping
// - `frame_source`:  where frames come from

pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use core_modules::bitmap::Bitmap;
pub use core_modules::classifier::{Coin, Denomination};
pub use core_modules::region::{AdmissionTest, BoundingBox, Region};
pub use error::{Result, VisionError};
pub use pipeline::{CoinPipeline, FrameReport, PipelineConfig, ReportSink};
