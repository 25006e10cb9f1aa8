// THEORY:
// A `Region` is the geometric summary of one connected patch of foreground pixels
// in a binary mask: how many pixels it has, where its centre is, what box encloses
// it, and how round it is.
//
// Key architectural principles:
// 1.  **Cheap Shape Measures**: The perimeter is *not* traced along the contour. It
//     is the perimeter of the bounding box, `2 * ((x2 - x1) + (y2 - y1))`, and the
//     circularity `4 * pi * area / perimeter^2` is computed from that. A filled
//     disk therefore scores about pi^2 / 16 (~0.62) rather than 1.0, and elongated
//     shapes score low. Classification thresholds are calibrated against this
//     measure, so it stays.
// 2.  **Accumulate, Then Freeze**: The flood fill feeds pixels into a
//     `RegionAccumulator`; once the fill is done the accumulator is frozen into an
//     immutable `Region`.
// 3.  **Admission Is Not Failure**: Small or ragged regions are filtered by an
//     `AdmissionTest`. Rejection is a routine outcome and is never an error.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A pixel coordinate in the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Inclusive, axis-aligned pixel bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1 + 1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1 + 1
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.x1 as f64 <= x && x <= self.x2 as f64 && self.y1 as f64 <= y && y <= self.y2 as f64
    }
}

/// Running totals for a region that is still being filled.
#[derive(Debug, Clone)]
pub struct RegionAccumulator {
    pub area: usize,
    pub sum_x: u64,
    pub sum_y: u64,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Default for RegionAccumulator {
    fn default() -> Self {
        Self {
            area: 0,
            sum_x: 0,
            sum_y: 0,
            min_x: u32::MAX,
            min_y: u32::MAX,
            max_x: 0,
            max_y: 0,
        }
    }
}

impl RegionAccumulator {
    #[inline]
    pub fn add(&mut self, point: Point) {
        self.area += 1;
        self.sum_x += point.x as u64;
        self.sum_y += point.y as u64;
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }

    /// Freezes the totals. Returns `None` for an empty accumulator.
    pub fn finish(&self, label: u32) -> Option<Region> {
        if self.area == 0 {
            return None;
        }
        let bounding_box = BoundingBox {
            x1: self.min_x,
            y1: self.min_y,
            x2: self.max_x,
            y2: self.max_y,
        };
        let span_x = bounding_box.x2 - bounding_box.x1;
        let span_y = bounding_box.y2 - bounding_box.y1;
        let perimeter = 2.0 * (span_x + span_y) as f64;
        let circularity = if perimeter > 0.0 {
            4.0 * PI * self.area as f64 / (perimeter * perimeter)
        } else {
            0.0
        };

        Some(Region {
            label,
            area: self.area,
            centroid: (
                self.sum_x as f64 / self.area as f64,
                self.sum_y as f64 / self.area as f64,
            ),
            bounding_box,
            perimeter,
            circularity,
        })
    }
}

/// Geometric features of one 4-connected foreground region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Fill order within the frame, starting at 1. Not persistent across frames.
    pub label: u32,
    /// Pixel count.
    pub area: usize,
    /// Mean of the member pixel coordinates.
    pub centroid: (f64, f64),
    pub bounding_box: BoundingBox,
    /// Bounding-box perimeter, standing in for the contour length.
    pub perimeter: f64,
    /// `4 * pi * area / perimeter^2`, or 0 for a region whose box has no extent.
    pub circularity: f64,
}

/// Default minimum area a region must exceed to be reported.
pub const MIN_REGION_AREA: usize = 300;
/// Default minimum circularity a region must exceed to be reported.
pub const MIN_CIRCULARITY: f64 = 0.75;

/// The gate a candidate region must pass to be reported as a coin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionTest {
    pub min_area: usize,
    pub min_circularity: f64,
}

impl Default for AdmissionTest {
    fn default() -> Self {
        Self {
            min_area: MIN_REGION_AREA,
            min_circularity: MIN_CIRCULARITY,
        }
    }
}

impl AdmissionTest {
    /// Both bounds are strict.
    pub fn admits(&self, region: &Region) -> bool {
        region.area > self.min_area && region.circularity > self.min_circularity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_from(points: &[(u32, u32)]) -> Region {
        let mut acc = RegionAccumulator::default();
        for &(x, y) in points {
            acc.add(Point { x, y });
        }
        acc.finish(1).expect("non-empty region")
    }

    #[test]
    fn empty_accumulator_yields_nothing() {
        assert!(RegionAccumulator::default().finish(1).is_none());
    }

    #[test]
    fn features_of_a_filled_square() {
        let points: Vec<(u32, u32)> = (10..20)
            .flat_map(|y| (30..40).map(move |x| (x, y)))
            .collect();
        let region = region_from(&points);

        assert_eq!(region.area, 100);
        assert_eq!(
            region.bounding_box,
            BoundingBox {
                x1: 30,
                y1: 10,
                x2: 39,
                y2: 19
            }
        );
        assert_eq!(region.centroid, (34.5, 14.5));
        assert_eq!(region.perimeter, 36.0);
        let expected = 4.0 * PI * 100.0 / (36.0 * 36.0);
        assert!((region.circularity - expected).abs() < 1e-12);
        assert!(region.bounding_box.contains(region.centroid.0, region.centroid.1));
    }

    #[test]
    fn single_pixel_has_zero_circularity() {
        let region = region_from(&[(5, 5)]);
        assert_eq!(region.perimeter, 0.0);
        assert_eq!(region.circularity, 0.0);
        assert_eq!((region.bounding_box.width(), region.bounding_box.height()), (1, 1));
    }

    #[test]
    fn admission_bounds_are_strict() {
        let gate = AdmissionTest {
            min_area: 100,
            min_circularity: 0.5,
        };
        let mut region = region_from(&[(0, 0), (1, 0)]);

        region.area = 100;
        region.circularity = 0.9;
        assert!(!gate.admits(&region));

        region.area = 101;
        assert!(gate.admits(&region));

        region.circularity = 0.5;
        assert!(!gate.admits(&region));
    }
}
