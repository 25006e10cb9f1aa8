// THEORY:
// The `pipeline` module is the top-level API of the coin vision engine. It strings
// the stages together for one frame at a time:
//
//   frame -> segment -> mask -> extract regions -> classify -> FrameReport
//
// and hands the report to whoever is drawing or logging it. Frames are processed
// strictly one after another. The only thing that survives from one frame to the
// next is scratch storage (the visited map, the last mask), and the visited map is
// cleared before every extraction.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core_modules::bitmap::Bitmap;
use crate::core_modules::blob_detector::{BlobExtractor, VisitedMap};
use crate::core_modules::classifier::{ClassifierConfig, Coin, CoinClassifier, Denomination};
use crate::core_modules::frame_source::FrameSource;
use crate::core_modules::region::AdmissionTest;
use crate::core_modules::segmentation;
use crate::error::Result;

/// Default cap on coins reported per frame.
pub const DEFAULT_MAX_REGIONS: usize = 100;

/// Tunable behaviour of the `CoinPipeline`. Every field has a default, so a config
/// file only needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Extraction stops once this many coins were admitted in a frame.
    pub max_regions: usize,
    pub admission: AdmissionTest,
    pub classifier: ClassifierConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_regions: DEFAULT_MAX_REGIONS,
            admission: AdmissionTest::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

/// Everything the core reports about one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// 1-based position of the frame in the run.
    pub frame_index: u64,
    /// Coins in raster discovery order.
    pub coins: Vec<Coin>,
    /// Sum of the face values, in cents.
    pub total_cents: u32,
    pub counts: BTreeMap<Denomination, usize>,
}

impl FrameReport {
    fn new(frame_index: u64, coins: Vec<Coin>) -> Self {
        let mut counts = BTreeMap::new();
        let mut total_cents = 0;
        for coin in &coins {
            *counts.entry(coin.denomination).or_insert(0) += 1;
            total_cents += coin.denomination.cents();
        }
        Self {
            frame_index,
            coins,
            total_cents,
            counts,
        }
    }

    pub fn coin_count(&self) -> usize {
        self.coins.len()
    }

    /// Total face value in euros.
    pub fn total_value(&self) -> f64 {
        self.total_cents as f64 / 100.0
    }
}

/// Receives one report per processed frame.
pub trait ReportSink {
    fn consume(&mut self, frame: &Bitmap, report: &FrameReport) -> Result<()>;

    /// Called by `CoinPipeline::run` with each frame's segmented mask, before
    /// `consume`.
    fn consume_mask(&mut self, _mask: &Bitmap, _report: &FrameReport) -> Result<()> {
        Ok(())
    }
}

/// The main, top-level struct for the coin vision engine.
pub struct CoinPipeline {
    config: PipelineConfig,
    extractor: BlobExtractor,
    classifier: CoinClassifier,
    visited: VisitedMap,
    last_mask: Option<Bitmap>,
    frame_count: u64,
}

impl CoinPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            extractor: BlobExtractor::new(config.admission),
            classifier: CoinClassifier::new(config.classifier.clone()),
            config,
            visited: VisitedMap::default(),
            last_mask: None,
            frame_count: 0,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Segments, measures and classifies one 3-channel frame.
    pub fn process_frame(&mut self, frame: &Bitmap) -> Result<FrameReport> {
        let mask = segmentation::segment(frame)?;
        let report = self.process_mask(&mask)?;
        self.last_mask = Some(mask);
        Ok(report)
    }

    /// Measures and classifies an already segmented binary mask.
    pub fn process_mask(&mut self, mask: &Bitmap) -> Result<FrameReport> {
        let regions = self
            .extractor
            .extract_with(mask, self.config.max_regions, &mut self.visited)?;
        let coins: Vec<Coin> = regions
            .into_iter()
            .map(|region| self.classifier.coin(region))
            .collect();

        self.frame_count += 1;
        let report = FrameReport::new(self.frame_count, coins);
        debug!(
            "frame {}: {} coin(s), {} cents",
            report.frame_index,
            report.coin_count(),
            report.total_cents
        );
        Ok(report)
    }

    pub fn frames_processed(&self) -> u64 {
        self.frame_count
    }

    /// The mask produced by the most recent `process_frame` call.
    pub fn last_mask(&self) -> Option<&Bitmap> {
        self.last_mask.as_ref()
    }

    /// Drains `source` frame by frame into `sink`. Returns the number of frames
    /// processed. The first error stops the run.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<u64>
    where
        S: FrameSource + ?Sized,
        K: ReportSink + ?Sized,
    {
        let mut processed = 0;
        while let Some(frame) = source.next_frame()? {
            let report = self.process_frame(&frame)?;
            if let Some(mask) = &self.last_mask {
                sink.consume_mask(mask, &report)?;
            }
            sink.consume(&frame, &report)?;
            processed += 1;
        }
        debug!("frame source exhausted after {} frame(s)", processed);
        Ok(processed)
    }
}
