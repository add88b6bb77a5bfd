//! Error types surfaced by the map and its tunables.

use thiserror::Error;

/// Returned by bounds-checked access (`at`, `at_mut`) when the key is absent.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("key not found")]
pub struct KeyNotFound;

/// Rejected tunable update. The previous value stays in effect.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum TunablesError {
    #[error("default capacity must be at least one bucket")]
    ZeroCapacity,
    #[error("enlarge coefficient must be finite and positive, got {0}")]
    InvalidEnlargeCoefficient(f64),
    #[error("reduce coefficient must be finite and greater than one, got {0}")]
    InvalidReduceCoefficient(f64),
}
