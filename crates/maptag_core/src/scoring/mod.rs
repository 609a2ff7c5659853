//! Pure duplicate-scoring functions.
//!
//! # Responsibility
//! - Name similarity from Levenshtein edit distance.
//! - Distance bucket, category match and weighted composite scores.
//!
//! # Invariants
//! - Every score returned here lies in `[0, 1]`.
//! - No function in this module touches storage.

pub mod composite;
pub mod similarity;

pub use composite::{
    category_score, CompositeScore, DistanceBucket, DuplicateDetectionConfig, ScoreWeights,
};
pub use similarity::{edit_distance, name_similarity};
