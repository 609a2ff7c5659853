//! Distance, category and composite duplicate scores.

use super::similarity::name_similarity;
use serde::{Deserialize, Serialize};

/// Upper distance bound (inclusive, meters) and the score awarded within it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceBucket {
    pub max_distance_m: f64,
    pub score: f64,
}

/// Weights of the composite blend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub distance: f64,
    pub name: f64,
    pub category: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            distance: 0.5,
            name: 0.3,
            category: 0.2,
        }
    }
}

/// Tunable constants of the duplicate detector.
///
/// `Default` reproduces the production values: 50 m radius, buckets
/// 10/20/30/50 m scoring 1.0/0.8/0.6/0.4 (0.2 beyond), weights 0.5/0.3/0.2
/// and a strict 0.7 likely-duplicate threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateDetectionConfig {
    pub radius_m: f64,
    /// Checked in order; the first bucket whose bound covers the distance wins.
    pub distance_buckets: Vec<DistanceBucket>,
    pub beyond_buckets_score: f64,
    pub weights: ScoreWeights,
    /// A candidate is a likely duplicate iff its composite is strictly above.
    pub likely_duplicate_threshold: f64,
}

impl Default for DuplicateDetectionConfig {
    fn default() -> Self {
        Self {
            radius_m: 50.0,
            distance_buckets: vec![
                DistanceBucket {
                    max_distance_m: 10.0,
                    score: 1.0,
                },
                DistanceBucket {
                    max_distance_m: 20.0,
                    score: 0.8,
                },
                DistanceBucket {
                    max_distance_m: 30.0,
                    score: 0.6,
                },
                DistanceBucket {
                    max_distance_m: 50.0,
                    score: 0.4,
                },
            ],
            beyond_buckets_score: 0.2,
            weights: ScoreWeights::default(),
            likely_duplicate_threshold: 0.7,
        }
    }
}

impl DuplicateDetectionConfig {
    /// Step-function score for a distance in meters.
    pub fn distance_score(&self, distance_m: f64) -> f64 {
        self.distance_buckets
            .iter()
            .find(|bucket| distance_m <= bucket.max_distance_m)
            .map_or(self.beyond_buckets_score, |bucket| bucket.score)
            .clamp(0.0, 1.0)
    }

    /// Scores one candidate against the submitted name/category.
    pub fn score(
        &self,
        distance_m: f64,
        submitted_name: &str,
        candidate_name: &str,
        submitted_category: &str,
        candidate_category: &str,
    ) -> CompositeScore {
        let distance = self.distance_score(distance_m);
        let name = name_similarity(submitted_name, candidate_name);
        let category = category_score(submitted_category, candidate_category);
        let weights = self.weights;
        let composite = (weights.distance * distance
            + weights.name * name
            + weights.category * category)
            .clamp(0.0, 1.0);

        CompositeScore {
            distance,
            name,
            category,
            composite,
            is_likely_duplicate: composite > self.likely_duplicate_threshold,
        }
    }
}

/// Exact string match of (already defaulted) categories.
pub fn category_score(a: &str, b: &str) -> f64 {
    if a == b {
        1.0
    } else {
        0.0
    }
}

/// Per-candidate score breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub distance: f64,
    pub name: f64,
    pub category: f64,
    pub composite: f64,
    pub is_likely_duplicate: bool,
}

#[cfg(test)]
mod tests {
    use super::{category_score, DuplicateDetectionConfig};

    #[test]
    fn distance_score_buckets() {
        let config = DuplicateDetectionConfig::default();
        assert_eq!(config.distance_score(0.0), 1.0);
        assert_eq!(config.distance_score(5.0), 1.0);
        assert_eq!(config.distance_score(10.0), 1.0);
        assert_eq!(config.distance_score(10.5), 0.8);
        assert_eq!(config.distance_score(20.0), 0.8);
        assert_eq!(config.distance_score(30.0), 0.6);
        assert_eq!(config.distance_score(50.0), 0.4);
        assert_eq!(config.distance_score(100.0), 0.2);
    }

    #[test]
    fn distance_score_is_non_increasing() {
        let config = DuplicateDetectionConfig::default();
        let mut previous = f64::INFINITY;
        for step in 0..=200 {
            let score = config.distance_score(step as f64 * 0.5);
            assert!(score <= previous);
            previous = score;
        }
    }

    #[test]
    fn category_is_exact_match() {
        assert_eq!(category_score("Commerce", "Commerce"), 1.0);
        assert_eq!(category_score("Commerce", "commerce"), 0.0);
    }

    #[test]
    fn identical_nearby_candidate_is_likely_duplicate() {
        let config = DuplicateDetectionConfig::default();
        let score = config.score(0.0, "Shop A", "shop a", "Commerce", "Commerce");
        assert_eq!(score.composite, 1.0);
        assert!(score.is_likely_duplicate);
    }

    #[test]
    fn threshold_is_strict() {
        // 0.5 * 1.0 + 0.3 * 0.0 + 0.2 * 1.0 = 0.7 exactly
        let config = DuplicateDetectionConfig::default();
        let score = config.score(3.0, "abc", "xyz", "Commerce", "Commerce");
        assert!((score.composite - 0.7).abs() < 1e-12);
        assert!(!score.is_likely_duplicate);

        let at_threshold = DuplicateDetectionConfig {
            likely_duplicate_threshold: score.composite,
            ..DuplicateDetectionConfig::default()
        };
        let rescored = at_threshold.score(3.0, "abc", "xyz", "Commerce", "Commerce");
        assert!(!rescored.is_likely_duplicate);
    }

    #[test]
    fn composite_stays_in_unit_interval() {
        let config = DuplicateDetectionConfig::default();
        for distance in [0.0, 12.0, 25.0, 45.0, 80.0, 1_000.0] {
            for (a, b) in [("", "x"), ("Shop", "Shop"), ("Kiosk", "Kiosque")] {
                for (ca, cb) in [("Other", "Other"), ("Other", "Health")] {
                    let score = config.score(distance, a, b, ca, cb);
                    assert!((0.0..=1.0).contains(&score.composite));
                    assert_eq!(
                        score.is_likely_duplicate,
                        score.composite > config.likely_duplicate_threshold
                    );
                }
            }
        }
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: DuplicateDetectionConfig =
            serde_json::from_str(r#"{"likely_duplicate_threshold": 0.8}"#).unwrap();
        assert_eq!(config.likely_duplicate_threshold, 0.8);
        assert_eq!(config.radius_m, 50.0);
        assert_eq!(config.distance_buckets.len(), 4);
    }
}
