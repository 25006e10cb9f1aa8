// THEORY:
// The `BlobExtractor` is the engine of the measurement layer. It implements binary
// connected-component labelling by iterative flood fill and turns every labelled
// component into a `Region`.
//
// Key architectural principles & algorithm steps:
// 1.  **Raster Seeding**: The mask is scanned row by row. The first foreground pixel
//     (255) that no earlier fill has claimed becomes the seed of a new region, so
//     regions come out in raster discovery order.
// 2.  **Iterative Flood Fill**: Each seed is grown with an explicit stack, never
//     with call-stack recursion, so a coin covering the whole frame cannot blow
//     the stack. Connectivity is 4-neighbour. A neighbour is pushed only when it
//     is inside the image, exactly 255 and unclaimed; a popped pixel is claimed
//     before its neighbours are pushed, and a pixel that was pushed twice is
//     skipped the second time. Every pixel is therefore processed at most once.
// 3.  **Label Map**: The visited map stores which fill claimed each pixel (0 means
//     unclaimed). Features are accumulated while a fill claims its pixels, which
//     is exactly what a rescan of the mask for that fill's label would produce.
// 4.  **Admission**: Regions that fail the `AdmissionTest` are dropped silently
//     but keep their labels, so their pixels are never seeded again. Extraction
//     stops as soon as the caller's `max_regions` cap of admitted regions is met.
// 5.  **Per-Frame State Only**: The extractor itself holds nothing but its
//     admission test. A `VisitedMap` may be reused from frame to frame, and is
//     cleared at the start of every extraction.

use log::{debug, trace};

use crate::core_modules::bitmap::Bitmap;
use crate::core_modules::region::{AdmissionTest, Point, Region, RegionAccumulator};
use crate::core_modules::transforms::FOREGROUND;
use crate::error::{Result, VisionError};

/// Per-pixel fill labels for one extraction pass.
#[derive(Debug, Clone, Default)]
pub struct VisitedMap {
    width: usize,
    height: usize,
    labels: Vec<u32>,
}

impl VisitedMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            labels: vec![0; width * height],
        }
    }

    /// Resizes to `width` x `height` and marks every pixel unvisited.
    pub fn reset(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.labels.clear();
        self.labels.resize(width * height, 0);
    }

    #[inline]
    pub fn is_visited(&self, x: usize, y: usize) -> bool {
        self.labels[y * self.width + x] != 0
    }

    /// The fill that claimed `(x, y)`, if any.
    #[inline]
    pub fn label(&self, x: usize, y: usize) -> Option<u32> {
        match self.labels[y * self.width + x] {
            0 => None,
            label => Some(label),
        }
    }

    #[inline]
    fn claim(&mut self, x: usize, y: usize, label: u32) {
        self.labels[y * self.width + x] = label;
    }

    pub fn visited_count(&self) -> usize {
        self.labels.iter().filter(|&&label| label != 0).count()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

const NEIGHBOURS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Claims every foreground pixel 4-connected to `seed` with `label` and returns the
/// accumulated statistics of the claimed pixels.
///
/// `label` must be non-zero. A seed that is background or already claimed yields
/// an empty accumulator. The mask must have one channel, `visited` must match its
/// size and `seed` must lie inside it.
pub fn flood_fill(
    mask: &Bitmap,
    visited: &mut VisitedMap,
    seed: Point,
    label: u32,
) -> Result<RegionAccumulator> {
    debug_assert!(label != 0, "label 0 means unvisited");
    let (width, height) = (mask.width(), mask.height());
    if mask.channels() != 1 {
        return Err(VisionError::shape(
            "flood_fill",
            format!("expected a 1-channel mask, got {}", mask.describe()),
        ));
    }
    if (visited.width(), visited.height()) != (width, height) {
        return Err(VisionError::shape(
            "flood_fill",
            format!(
                "visited map is {}x{}, mask is {}x{}",
                visited.width(),
                visited.height(),
                width,
                height
            ),
        ));
    }
    if seed.x as usize >= width || seed.y as usize >= height {
        return Err(VisionError::shape(
            "flood_fill",
            format!("seed ({}, {}) outside {}x{}", seed.x, seed.y, width, height),
        ));
    }
    let mut stats = RegionAccumulator::default();
    let mut stack: Vec<Point> = vec![seed];

    while let Some(current) = stack.pop() {
        let (x, y) = (current.x as usize, current.y as usize);
        if mask.get(x, y, 0) != FOREGROUND || visited.is_visited(x, y) {
            continue;
        }
        visited.claim(x, y, label);
        stats.add(current);

        for (dx, dy) in NEIGHBOURS {
            let (Some(nx), Some(ny)) = (x.checked_add_signed(dx), y.checked_add_signed(dy))
            else {
                continue;
            };
            if nx < width
                && ny < height
                && mask.get(nx, ny, 0) == FOREGROUND
                && !visited.is_visited(nx, ny)
            {
                stack.push(Point {
                    x: nx as u32,
                    y: ny as u32,
                });
            }
        }
    }

    Ok(stats)
}

/// Finds, measures and filters the foreground regions of a binary mask.
#[derive(Debug, Clone, Default)]
pub struct BlobExtractor {
    admission: AdmissionTest,
}

impl BlobExtractor {
    pub fn new(admission: AdmissionTest) -> Self {
        Self { admission }
    }

    pub fn admission(&self) -> &AdmissionTest {
        &self.admission
    }

    /// Extracts up to `max_regions` admitted regions with a fresh visited map.
    pub fn extract(&self, mask: &Bitmap, max_regions: usize) -> Result<Vec<Region>> {
        let mut visited = VisitedMap::default();
        self.extract_with(mask, max_regions, &mut visited)
    }

    /// Like `extract`, but reuses the caller's visited map. The map is reset first.
    pub fn extract_with(
        &self,
        mask: &Bitmap,
        max_regions: usize,
        visited: &mut VisitedMap,
    ) -> Result<Vec<Region>> {
        if mask.channels() != 1 {
            return Err(VisionError::shape(
                "extract",
                format!("expected a 1-channel mask, got {}", mask.describe()),
            ));
        }
        let (width, height) = (mask.width(), mask.height());
        visited.reset(width, height);

        let mut regions = Vec::new();
        if max_regions == 0 {
            return Ok(regions);
        }
        let mut next_label = 1u32;

        'scan: for y in 0..height {
            for x in 0..width {
                if mask.get(x, y, 0) != FOREGROUND || visited.is_visited(x, y) {
                    continue;
                }

                let seed = Point {
                    x: x as u32,
                    y: y as u32,
                };
                trace!("seeding region {} at ({}, {})", next_label, x, y);
                let stats = flood_fill(mask, visited, seed, next_label)?;
                let label = next_label;
                next_label += 1;

                let Some(region) = stats.finish(label) else {
                    continue;
                };
                if !self.admission.admits(&region) {
                    debug!(
                        "rejected region {}: area {}, circularity {:.3}",
                        label, region.area, region.circularity
                    );
                    continue;
                }

                debug!(
                    "admitted region {}: area {}, circularity {:.3}, box {:?}",
                    label, region.area, region.circularity, region.bounding_box
                );
                regions.push(region);
                if regions.len() == max_regions {
                    break 'scan;
                }
            }
        }

        Ok(regions)
    }
}
