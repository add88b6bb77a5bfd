//! chained-hashmap: a separate-chaining hash map whose iteration skips
//! empty buckets by following an index of occupied ones.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a single-threaded associative container with unique keys,
//!   bracket-style default insertion, bounds-checked access, and a
//!   traversal order that depends only on the sequence of operations.
//! - Layers:
//!   - FilledIndex: arrival-ordered list of occupied bucket indices, stored
//!     in a `SlotMap` so each position has a stable generational handle
//!     (`Slot`) that removes it in O(1).
//!   - Bucket: one collision chain (insertion-ordered entries) plus the
//!     `Slot` that links it into the FilledIndex while non-empty.
//!   - ChainedHashMap<K, V, S>: the bucket array, the FilledIndex, the
//!     entry count and the growth policy.
//!   - Cursors/iterators: a (bucket, offset) position walked in FilledIndex
//!     order, then chain order.
//!
//! Constraints
//! - Keys are immutable once inserted; only values are handed out mutably.
//! - Duplicate inserts are no-ops: the first value for a key wins.
//! - `remove` of an absent key is a no-op; only `at`/`at_mut` report a
//!   missing key, via `KeyNotFound`.
//! - The bucket count never decreases on `remove`; `clear` resets it.
//!
//! Hasher and rehashing invariants
//! - Each entry stores the `u64` produced by `S::hash_one` at insertion.
//!   The bucket index is always `hash % capacity`; growing recomputes it
//!   from the stored hash, so `K: Hash` is never invoked during a rehash.
//!
//! Growth
//! - After every successful insert, if `len * enlarge_coaf >= capacity` the
//!   table is rebuilt at twice the capacity. Re-insertion during the rebuild
//!   does not evaluate the trigger, so one insert grows at most once.
//! - `default_capacity`, `rehash_enlarge_coaf` and `rehash_reduce_coaf` are
//!   process-wide per concrete map type (see `Tunables`). A map reads them
//!   live, so updates reach maps that already exist.
//!
//! Ordering and invalidation
//! - Traversal order is the order in which buckets first became occupied,
//!   then insertion order within each chain. A grow reorders everything; a
//!   removal rebuilds one chain and unlinks its bucket when emptied.
//! - Cursors and iterators borrow the map, so the borrow checker rules out
//!   using one across a mutation.
//!
//! Copy and move
//! - `Clone` re-inserts every entry into a fresh table in traversal order;
//!   the copy's capacity and its own traversal order follow the growth
//!   policy, not the source layout. Copies compare equal to the source.
//! - Moving a map transfers its storage; `std::mem::take` leaves an empty
//!   map at `default_capacity`.
//!
//! Logging
//! - With the `tracing` feature, grow, clear, clone and tunable updates emit
//!   `trace`-level events under the `chained_hashmap` target.

mod bucket;
mod cfg;
mod chained_hash_map;
mod chained_hash_map_proptest;
pub mod cursor;
mod error;
mod filled_index;
mod tunables;

// Public surface
pub use chained_hash_map::ChainedHashMap;
pub use cursor::{Cursor, CursorMut, Drain, IntoIter, Iter, IterMut};
pub use error::{KeyNotFound, TunablesError};
pub use hashbrown::hash_map::DefaultHashBuilder;
pub use tunables::{Tunables, DEFAULT_CAPACITY, DEFAULT_ENLARGE_COAF, DEFAULT_REDUCE_COAF};
