//! Process-wide growth tunables, one set per map specialization.
//!
//! Every concrete `ChainedHashMap<K, V, S>` type owns exactly one `Tunables`
//! instance, created lazily the first time a map of that type is built. Maps
//! hold an `Arc` to it and read it on every insert, so an update is observed
//! by all existing and future maps of that type. Set values before building
//! maps if you want predictable capacities.

use crate::cfg::trace;
use crate::error::TunablesError;
use core::any::TypeId;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use hashbrown::HashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

/// Initial bucket count, and the bucket count `clear` resets to.
pub const DEFAULT_CAPACITY: usize = 8;
/// Grow when `len * enlarge_coaf >= capacity`.
pub const DEFAULT_ENLARGE_COAF: f64 = 2.0;
/// Shrink coefficient. Kept for parity with the enlarge knob; no operation shrinks.
pub const DEFAULT_REDUCE_COAF: f64 = 4.0;

static REGISTRY: Lazy<RwLock<HashMap<TypeId, Arc<Tunables>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Shared growth settings of one map specialization.
#[derive(Debug)]
pub struct Tunables {
    default_capacity: AtomicUsize,
    // f64 bit patterns
    enlarge_coaf: AtomicU64,
    reduce_coaf: AtomicU64,
}

impl Tunables {
    fn new() -> Self {
        Self {
            default_capacity: AtomicUsize::new(DEFAULT_CAPACITY),
            enlarge_coaf: AtomicU64::new(DEFAULT_ENLARGE_COAF.to_bits()),
            reduce_coaf: AtomicU64::new(DEFAULT_REDUCE_COAF.to_bits()),
        }
    }

    /// The tunables of specialization `T`, created with defaults on first use.
    pub(crate) fn of<T: 'static>() -> Arc<Tunables> {
        let id = TypeId::of::<T>();
        if let Some(t) = REGISTRY.read().get(&id) {
            return Arc::clone(t);
        }
        let mut registry = REGISTRY.write();
        Arc::clone(
            registry
                .entry(id)
                .or_insert_with(|| Arc::new(Tunables::new())),
        )
    }

    #[inline]
    pub fn default_capacity(&self) -> usize {
        self.default_capacity.load(Ordering::Relaxed)
    }

    pub fn set_default_capacity(&self, capacity: usize) -> Result<(), TunablesError> {
        if capacity == 0 {
            return Err(TunablesError::ZeroCapacity);
        }
        trace!(capacity, "default capacity updated");
        self.default_capacity.store(capacity, Ordering::Relaxed);
        Ok(())
    }

    #[inline]
    pub fn rehash_enlarge_coaf(&self) -> f64 {
        f64::from_bits(self.enlarge_coaf.load(Ordering::Relaxed))
    }

    pub fn set_rehash_enlarge_coaf(&self, coaf: f64) -> Result<(), TunablesError> {
        if !coaf.is_finite() || coaf <= 0.0 {
            return Err(TunablesError::InvalidEnlargeCoefficient(coaf));
        }
        trace!(coaf, "enlarge coefficient updated");
        self.enlarge_coaf.store(coaf.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    #[inline]
    pub fn rehash_reduce_coaf(&self) -> f64 {
        f64::from_bits(self.reduce_coaf.load(Ordering::Relaxed))
    }

    /// Stored for completeness; erase never shrinks the table.
    pub fn set_rehash_reduce_coaf(&self, coaf: f64) -> Result<(), TunablesError> {
        if !coaf.is_finite() || coaf <= 1.0 {
            return Err(TunablesError::InvalidReduceCoefficient(coaf));
        }
        trace!(coaf, "reduce coefficient updated");
        self.reduce_coaf.store(coaf.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Restore all three values to their defaults.
    pub fn reset(&self) {
        self.default_capacity.store(DEFAULT_CAPACITY, Ordering::Relaxed);
        self.enlarge_coaf.store(DEFAULT_ENLARGE_COAF.to_bits(), Ordering::Relaxed);
        self.reduce_coaf.store(DEFAULT_REDUCE_COAF.to_bits(), Ordering::Relaxed);
    }

    /// Load factor trigger evaluated after each successful insert.
    #[inline]
    pub(crate) fn should_grow(&self, len: usize, capacity: usize) -> bool {
        len as f64 * self.rehash_enlarge_coaf() >= capacity as f64
    }
}
