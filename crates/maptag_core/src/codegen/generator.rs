//! Coordinate-derived code generation with an injected suffix source.

use super::city::city_token;
use super::code::{AddressCode, CodeFormatError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Characters allowed in the random suffix segment.
pub const SUFFIX_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 4;
const GRID_LEN: usize = 4;

/// Source of the random `XXXX` segment, drawn once per generation attempt.
pub trait SuffixSource {
    fn next_suffix(&mut self) -> String;
}

/// Production suffix source backed by `rand`.
pub struct RandomSuffix<R: Rng = StdRng> {
    rng: R,
}

impl RandomSuffix<StdRng> {
    /// Seeded from the OS; what the CLI uses for real registrations.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence, mainly for tests and fixtures.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> SuffixSource for RandomSuffix<R> {
    fn next_suffix(&mut self) -> String {
        (0..SUFFIX_LEN)
            .map(|_| char::from(SUFFIX_ALPHABET[self.rng.gen_range(0..SUFFIX_ALPHABET.len())]))
            .collect()
    }
}

impl<S: SuffixSource + ?Sized> SuffixSource for &mut S {
    fn next_suffix(&mut self) -> String {
        (**self).next_suffix()
    }
}

/// Builds candidate codes; holds no knowledge of persisted codes.
pub struct CodeGenerator<S: SuffixSource> {
    suffixes: S,
}

impl<S: SuffixSource> CodeGenerator<S> {
    pub fn new(suffixes: S) -> Self {
        Self { suffixes }
    }

    /// Produces one candidate code for the point.
    ///
    /// # Errors
    /// - Returns `CodeFormatError` only when the suffix source yields text
    ///   outside `[A-Z0-9]{4}`; `RandomSuffix` never does.
    pub fn generate(&mut self, lat: f64, lon: f64) -> Result<AddressCode, CodeFormatError> {
        let suffix = self.suffixes.next_suffix();
        AddressCode::from_parts(city_token(lat, lon), &grid_token(lat, lon), &suffix)
    }
}

/// Locality hint: last four digits of the scaled lat/lon grid indices.
///
/// Coordinates are clamped to valid ranges so the token is always digits.
pub fn grid_token(lat: f64, lon: f64) -> String {
    let lat_grid = ((lat.clamp(-90.0, 90.0) + 90.0) * 100.0).floor() as u64;
    let lon_grid = ((lon.clamp(-180.0, 180.0) + 180.0) * 100.0).floor() as u64;
    let joined = format!("{lat_grid}{lon_grid}");
    let tail = &joined[joined.len().saturating_sub(GRID_LEN)..];
    format!("{:0>width$}", tail, width = GRID_LEN)
}
