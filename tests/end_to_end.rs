use std::f64::consts::PI;

use coin_vision::core_modules::blob_detector::BlobExtractor;
use coin_vision::core_modules::netpbm;
use coin_vision::core_modules::transforms::FOREGROUND;
use coin_vision::{AdmissionTest, Bitmap, BoundingBox, CoinPipeline, Denomination, PipelineConfig};

const WIDTH: usize = 200;
const HEIGHT: usize = 120;

struct Disk {
    cx: i64,
    cy: i64,
    r: i64,
}

impl Disk {
    fn contains(&self, x: usize, y: usize) -> bool {
        let (dx, dy) = (x as i64 - self.cx, y as i64 - self.cy);
        dx * dx + dy * dy <= self.r * self.r
    }

    fn pixel_count(&self) -> usize {
        (0..HEIGHT)
            .flat_map(|y| (0..WIDTH).map(move |x| (x, y)))
            .filter(|&(x, y)| self.contains(x, y))
            .count()
    }

    fn extent(&self) -> BoundingBox {
        BoundingBox {
            x1: (self.cx - self.r) as u32,
            y1: (self.cy - self.r) as u32,
            x2: (self.cx + self.r) as u32,
            y2: (self.cy + self.r) as u32,
        }
    }
}

fn disks() -> [Disk; 2] {
    [
        Disk {
            cx: 40,
            cy: 40,
            r: 20,
        },
        Disk {
            cx: 120,
            cy: 60,
            r: 30,
        },
    ]
}

fn disk_mask(disks: &[Disk]) -> Bitmap {
    let mut mask = Bitmap::new(WIDTH, HEIGHT, 1, 255).expect("valid mask");
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            if disks.iter().any(|disk| disk.contains(x, y)) {
                mask.set(x, y, 0, FOREGROUND);
            }
        }
    }
    mask
}

fn disk_frame(disks: &[Disk], coin: u8, table: u8) -> Bitmap {
    let mut frame = Bitmap::new(WIDTH, HEIGHT, 3, 255).expect("valid frame");
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let value = if disks.iter().any(|disk| disk.contains(x, y)) {
                coin
            } else {
                table
            };
            for c in 0..3 {
                frame.set(x, y, c, value);
            }
        }
    }
    frame
}

/// A filled disk scores about pi^2 / 16 under the bounding-box perimeter.
fn disk_gate() -> AdmissionTest {
    AdmissionTest {
        min_circularity: 0.5,
        ..AdmissionTest::default()
    }
}

#[test]
fn two_disks_yield_two_regions_with_exact_extents() {
    let _ = env_logger::builder().is_test(true).try_init();
    let disks = disks();
    let mask = disk_mask(&disks);

    let regions = BlobExtractor::new(disk_gate())
        .extract(&mask, 10)
        .expect("1-channel mask");
    assert_eq!(regions.len(), 2);

    for (region, disk) in regions.iter().zip(&disks) {
        assert_eq!(region.bounding_box, disk.extent());
        assert_eq!(region.area, disk.pixel_count());
        assert_eq!(region.perimeter, 8.0 * disk.r as f64);

        let expected = 4.0 * PI * region.area as f64 / (64.0 * (disk.r * disk.r) as f64);
        assert!((region.circularity - expected).abs() < 1e-9);
        assert!((region.circularity - PI * PI / 16.0).abs() < 0.01);

        assert!((region.centroid.0 - disk.cx as f64).abs() < 1e-9);
        assert!((region.centroid.1 - disk.cy as f64).abs() < 1e-9);
    }
}

#[test]
fn default_gate_rejects_disks_by_circularity() {
    let mask = disk_mask(&disks());
    let regions = BlobExtractor::default()
        .extract(&mask, 10)
        .expect("1-channel mask");
    assert!(regions.is_empty());
}

#[test]
fn disks_classify_by_area() {
    let config = PipelineConfig {
        admission: disk_gate(),
        ..PipelineConfig::default()
    };
    let mut pipeline = CoinPipeline::new(config);
    let report = pipeline
        .process_mask(&disk_mask(&disks()))
        .expect("valid mask");

    // ~1257 px and ~2821 px
    let denominations: Vec<Denomination> =
        report.coins.iter().map(|coin| coin.denomination).collect();
    assert_eq!(
        denominations,
        vec![Denomination::OneCent, Denomination::TwoCents]
    );
    assert_eq!(report.total_cents, 3);
}

#[test]
fn colour_frame_runs_through_the_whole_pipeline() {
    let _ = env_logger::builder().is_test(true).try_init();
    let disks = disks();
    let frame = disk_frame(&disks, 220, 20);

    let config = PipelineConfig {
        admission: disk_gate(),
        ..PipelineConfig::default()
    };
    let mut pipeline = CoinPipeline::new(config);
    let report = pipeline.process_frame(&frame).expect("valid frame");

    assert_eq!(report.coin_count(), 2);
    for (coin, disk) in report.coins.iter().zip(&disks) {
        let (cx, cy) = coin.region.centroid;
        assert!((cx - disk.cx as f64).abs() < 1.0, "centroid x {cx}");
        assert!((cy - disk.cy as f64).abs() < 1.0, "centroid y {cy}");

        // Smoothing may pull at most one ring of edge pixels into the mask.
        let (found, exact) = (coin.region.bounding_box, disk.extent());
        assert!(found.x1 + 1 >= exact.x1 && found.x1 <= exact.x1);
        assert!(found.x2 <= exact.x2 + 1 && found.x2 >= exact.x2);
        assert!(found.y1 + 1 >= exact.y1 && found.y1 <= exact.y1);
        assert!(found.y2 <= exact.y2 + 1 && found.y2 >= exact.y2);
    }

    let mask = pipeline.last_mask().expect("mask kept");
    assert_eq!(mask.get(0, 0, 0), 0);
    assert_eq!(mask.get(40, 40, 0), FOREGROUND);
}

#[test]
fn frames_decoded_from_netpbm_match_in_memory_frames() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("coins.ppm");
    let frame = disk_frame(&disks(), 220, 20);
    netpbm::encode(&path, &frame).expect("write frame");

    let config = PipelineConfig {
        admission: disk_gate(),
        ..PipelineConfig::default()
    };
    let from_disk = CoinPipeline::new(config.clone())
        .process_frame(&netpbm::decode(&path).expect("read frame"))
        .expect("valid frame");
    let in_memory = CoinPipeline::new(config)
        .process_frame(&frame)
        .expect("valid frame");
    assert_eq!(from_disk, in_memory);
}
