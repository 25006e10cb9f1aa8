// Command-line runner: feeds still frames from disk through the coin pipeline and
// prints one report per frame.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use coin_vision::core_modules::frame_source::ImageSequence;
use coin_vision::core_modules::utils::image_helper;
use coin_vision::{Bitmap, CoinPipeline, FrameReport, PipelineConfig, ReportSink};

const FRAME_EXTENSIONS: &[&str] = &[
    "ppm", "pgm", "pbm", "png", "jpg", "jpeg", "bmp", "tif", "tiff",
];

#[derive(Parser)]
#[command(name = "coin_vision")]
#[command(version, about = "Count and value the coins in a sequence of frames", long_about = None)]
struct Cli {
    /// Frame files, or directories of frames (processed in name order)
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Pipeline configuration (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of coins reported per frame
    #[arg(long, value_name = "N")]
    max_regions: Option<usize>,

    /// Write each frame's binary mask as a PNG into this directory
    #[arg(long, value_name = "DIR")]
    dump_masks: Option<PathBuf>,

    /// Print one JSON report per line instead of text
    #[arg(long)]
    json: bool,
}

/// Prints the same summary the on-screen overlay shows.
struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> ReportSink for TextSink<W> {
    fn consume(&mut self, frame: &Bitmap, report: &FrameReport) -> coin_vision::Result<()> {
        writeln!(
            self.out,
            "frame {} ({}x{}): {} coin(s), {:.2} euros",
            report.frame_index,
            frame.width(),
            frame.height(),
            report.coin_count(),
            report.total_value()
        )?;
        for (denomination, count) in &report.counts {
            writeln!(self.out, "  {denomination}: {count}")?;
        }
        Ok(())
    }
}

struct JsonSink<W: Write> {
    out: W,
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn consume(&mut self, _frame: &Bitmap, report: &FrameReport) -> coin_vision::Result<()> {
        serde_json::to_writer(&mut self.out, report).map_err(io::Error::from)?;
        writeln!(self.out)?;
        Ok(())
    }
}

/// Writes each frame's mask as a PNG, then hands the report on to `inner`.
struct MaskDump {
    dir: Option<PathBuf>,
    inner: Box<dyn ReportSink>,
}

impl ReportSink for MaskDump {
    fn consume(&mut self, frame: &Bitmap, report: &FrameReport) -> coin_vision::Result<()> {
        self.inner.consume(frame, report)
    }

    fn consume_mask(&mut self, mask: &Bitmap, report: &FrameReport) -> coin_vision::Result<()> {
        if let Some(dir) = &self.dir {
            let path = dir.join(format!("mask_{:05}.png", report.frame_index));
            image_helper::save_png(&path, mask)?;
        }
        Ok(())
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn collect_frames(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            frames.push(input.clone());
            continue;
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(input)
            .with_context(|| format!("Failed to list {}", input.display()))?
        {
            let path = entry?.path();
            if path.is_file() && is_frame_file(&path) {
                entries.push(path);
            } else {
                warn!("skipping {}", path.display());
            }
        }
        entries.sort();
        frames.extend(entries);
    }
    Ok(frames)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(max_regions) = cli.max_regions {
        config.max_regions = max_regions;
    }

    if let Some(dir) = &cli.dump_masks {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let frames = collect_frames(&cli.inputs)?;
    info!("processing {} frame(s)", frames.len());
    let mut source = ImageSequence::new(frames);
    let mut pipeline = CoinPipeline::new(config);

    let stdout = io::stdout().lock();
    let inner: Box<dyn ReportSink> = if cli.json {
        Box::new(JsonSink { out: stdout })
    } else {
        Box::new(TextSink { out: stdout })
    };
    let mut sink = MaskDump {
        dir: cli.dump_masks,
        inner,
    };

    let processed = pipeline
        .run(&mut source, &mut sink)
        .with_context(|| format!("Failed after {} frame(s)", pipeline.frames_processed()))?;

    info!("done after {} frame(s)", processed);
    Ok(())
}
