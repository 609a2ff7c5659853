//! Case- and whitespace-insensitive name similarity.

/// Classic Levenshtein distance over Unicode scalar values, unit costs.
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Normalized similarity `1 - distance / max(len_a, len_b)`.
///
/// - Returns `0.0` when either raw input is empty.
/// - Inputs are trimmed and lowercased before comparison; equal normalized
///   strings score exactly `1.0`.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let left = a.trim().to_lowercase();
    let right = b.trim().to_lowercase();
    if left == right {
        return 1.0;
    }

    let max_len = left.chars().count().max(right.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = edit_distance(&left, &right);
    (1.0 - distance as f64 / max_len as f64).clamp(0.0, 1.0)
}
