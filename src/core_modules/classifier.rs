// THEORY:
// The classifier maps an admitted region to a euro coin purely by pixel area. The
// area buckets are ordered and exclusive: the first bucket whose upper bound is
// above the area wins, and anything larger than the last bound is the largest coin.
//
// The default bounds are empirical. They belong to one camera height and one lens,
// not to the physical diameters of the coins, which is why they live in
// `ClassifierConfig` and can be recalibrated from a config file.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core_modules::region::Region;

/// The eight euro coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Denomination {
    OneCent,
    TwoCents,
    FiveCents,
    TenCents,
    TwentyCents,
    FiftyCents,
    OneEuro,
    TwoEuros,
}

impl Denomination {
    pub const ALL: [Denomination; 8] = [
        Denomination::OneCent,
        Denomination::TwoCents,
        Denomination::FiveCents,
        Denomination::TenCents,
        Denomination::TwentyCents,
        Denomination::FiftyCents,
        Denomination::OneEuro,
        Denomination::TwoEuros,
    ];

    /// Face value in euro cents; doubles as the denomination code.
    pub fn cents(self) -> u32 {
        match self {
            Denomination::OneCent => 1,
            Denomination::TwoCents => 2,
            Denomination::FiveCents => 5,
            Denomination::TenCents => 10,
            Denomination::TwentyCents => 20,
            Denomination::FiftyCents => 50,
            Denomination::OneEuro => 100,
            Denomination::TwoEuros => 200,
        }
    }

    /// Face value in euros.
    pub fn value(self) -> f64 {
        self.cents() as f64 / 100.0
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cents() {
            1 => write!(f, "1 cent"),
            cents if cents < 100 => write!(f, "{cents} cents"),
            100 => write!(f, "1 euro"),
            cents => write!(f, "{} euros", cents / 100),
        }
    }
}

/// Regions with `area < below` fall into this bucket (if no earlier bucket took them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaBucket {
    pub below: usize,
    pub denomination: Denomination,
}

/// Area calibration for one camera setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Checked in order.
    pub buckets: Vec<AreaBucket>,
    /// Assigned when no bucket matches.
    pub largest: Denomination,
}

/// Default upper area bounds, in pixels, for 1c through 1 euro.
pub const DEFAULT_AREA_BOUNDS: [(usize, Denomination); 7] = [
    (2000, Denomination::OneCent),
    (3000, Denomination::TwoCents),
    (4000, Denomination::FiveCents),
    (5000, Denomination::TenCents),
    (6000, Denomination::TwentyCents),
    (7000, Denomination::FiftyCents),
    (8000, Denomination::OneEuro),
];

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_AREA_BOUNDS
                .iter()
                .map(|&(below, denomination)| AreaBucket {
                    below,
                    denomination,
                })
                .collect(),
            largest: Denomination::TwoEuros,
        }
    }
}

/// A region that has been given a denomination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub denomination: Denomination,
    pub region: Region,
}

impl Coin {
    pub fn value(&self) -> f64 {
        self.denomination.value()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoinClassifier {
    config: ClassifierConfig,
}

impl CoinClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn denomination_for_area(&self, area: usize) -> Denomination {
        self.config
            .buckets
            .iter()
            .find(|bucket| area < bucket.below)
            .map_or(self.config.largest, |bucket| bucket.denomination)
    }

    pub fn classify(&self, region: &Region) -> Denomination {
        self.denomination_for_area(region.area)
    }

    pub fn coin(&self, region: Region) -> Coin {
        Coin {
            denomination: self.classify(&region),
            region,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::region::BoundingBox;

    fn region_with_area(area: usize) -> Region {
        Region {
            label: 1,
            area,
            centroid: (10.0, 10.0),
            bounding_box: BoundingBox {
                x1: 0,
                y1: 0,
                x2: 20,
                y2: 20,
            },
            perimeter: 80.0,
            circularity: 0.8,
        }
    }

    #[test]
    fn scenario_areas() {
        let classifier = CoinClassifier::default();

        let two_cents = classifier.coin(region_with_area(2500));
        assert_eq!(two_cents.denomination, Denomination::TwoCents);
        assert_eq!(two_cents.value(), 0.02);

        let two_euros = classifier.coin(region_with_area(8200));
        assert_eq!(two_euros.denomination, Denomination::TwoEuros);
        assert_eq!(two_euros.value(), 2.0);
    }

    #[test]
    fn bucket_bounds_are_exclusive() {
        let classifier = CoinClassifier::default();
        let expectations = [
            (301, Denomination::OneCent),
            (1999, Denomination::OneCent),
            (2000, Denomination::TwoCents),
            (3999, Denomination::FiveCents),
            (4000, Denomination::TenCents),
            (5000, Denomination::TwentyCents),
            (6000, Denomination::FiftyCents),
            (7000, Denomination::OneEuro),
            (7999, Denomination::OneEuro),
            (8000, Denomination::TwoEuros),
        ];
        for (area, expected) in expectations {
            assert_eq!(classifier.denomination_for_area(area), expected, "area {area}");
        }
    }

    #[test]
    fn calibration_is_configurable() {
        let classifier = CoinClassifier::new(ClassifierConfig {
            buckets: vec![AreaBucket {
                below: 500,
                denomination: Denomination::TenCents,
            }],
            largest: Denomination::FiftyCents,
        });
        assert_eq!(classifier.denomination_for_area(499), Denomination::TenCents);
        assert_eq!(classifier.denomination_for_area(500), Denomination::FiftyCents);
    }

    #[test]
    fn labels_read_like_coins() {
        assert_eq!(Denomination::OneCent.to_string(), "1 cent");
        assert_eq!(Denomination::FiftyCents.to_string(), "50 cents");
        assert_eq!(Denomination::OneEuro.to_string(), "1 euro");
        assert_eq!(Denomination::TwoEuros.to_string(), "2 euros");
    }

    #[test]
    fn config_parses_from_json() {
        let json = r#"{
            "buckets": [{ "below": 1000, "denomination": "one_cent" }],
            "largest": "two_euros"
        }"#;
        let config: ClassifierConfig = serde_json::from_str(json).expect("valid config");
        assert_eq!(config.buckets.len(), 1);
        assert_eq!(config.buckets[0].denomination, Denomination::OneCent);

        let defaults: ClassifierConfig = serde_json::from_str("{}").expect("empty config");
        assert_eq!(defaults, ClassifierConfig::default());
    }
}
