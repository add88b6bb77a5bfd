//! Collision chains.
//!
//! A `Bucket` owns the entries whose hash lands on its index, in insertion
//! order, plus the `Slot` that places it in the map's `FilledIndex`. Entries
//! never move within a chain; removal rebuilds the chain from the survivors.

use crate::filled_index::Slot;
use core::borrow::Borrow;
use core::mem;

/// One key/value pair. The key is fixed once the entry exists; only the value
/// is reachable mutably.
#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    key: K,
    pub(crate) value: V,
    hash: u64,
}

impl<K, V> Entry<K, V> {
    #[inline]
    pub(crate) fn new(key: K, value: V, hash: u64) -> Self {
        Self { key, value, hash }
    }

    #[inline]
    pub(crate) fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub(crate) fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub(crate) fn pair(&self) -> (&K, &V) {
        (&self.key, &self.value)
    }

    #[inline]
    pub(crate) fn pair_mut(&mut self) -> (&K, &mut V) {
        (&self.key, &mut self.value)
    }

    #[inline]
    pub(crate) fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}

#[derive(Debug)]
pub(crate) struct Bucket<K, V> {
    nodes: Vec<Entry<K, V>>,
    // Some exactly while `nodes` is non-empty.
    slot: Option<Slot>,
}

impl<K, V> Default for Bucket<K, V> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            slot: None,
        }
    }
}

impl<K, V> Bucket<K, V> {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub(crate) fn slot(&self) -> Option<Slot> {
        self.slot
    }

    #[inline]
    pub(crate) fn set_slot(&mut self, slot: Slot) {
        debug_assert!(self.slot.is_none(), "bucket linked twice");
        self.slot = Some(slot);
    }

    #[inline]
    pub(crate) fn take_slot(&mut self) -> Option<Slot> {
        self.slot.take()
    }

    /// Offset of the entry matching `q`, comparing cached hashes first.
    pub(crate) fn position<Q>(&self, hash: u64, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.nodes
            .iter()
            .position(|e| e.hash == hash && e.key.borrow() == q)
    }

    #[inline]
    pub(crate) fn get(&self, offset: usize) -> Option<&Entry<K, V>> {
        self.nodes.get(offset)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, offset: usize) -> Option<&mut Entry<K, V>> {
        self.nodes.get_mut(offset)
    }

    /// Raw pointer to the entry at `offset`, obtained without borrowing the
    /// rest of the chain.
    #[inline]
    pub(crate) fn entry_ptr(&mut self, offset: usize) -> *mut Entry<K, V> {
        debug_assert!(offset < self.nodes.len());
        self.nodes.as_mut_ptr().wrapping_add(offset)
    }

    /// Value at `offset`. The offset must come from this chain.
    #[inline]
    pub(crate) fn value_mut(&mut self, offset: usize) -> &mut V {
        &mut self.nodes[offset].value
    }

    /// Append to the chain, returning the new entry's offset.
    #[inline]
    pub(crate) fn push(&mut self, entry: Entry<K, V>) -> usize {
        self.nodes.push(entry);
        self.nodes.len() - 1
    }

    /// Remove the entry at `offset` by moving every other entry into a fresh
    /// chain that replaces the current one.
    pub(crate) fn remove_at(&mut self, offset: usize) -> Option<Entry<K, V>> {
        if offset >= self.nodes.len() {
            return None;
        }
        let old = mem::take(&mut self.nodes);
        let mut rebuilt = Vec::with_capacity(old.len() - 1);
        let mut removed = None;
        for (i, e) in old.into_iter().enumerate() {
            if i == offset {
                removed = Some(e);
            } else {
                rebuilt.push(e);
            }
        }
        self.nodes = rebuilt;
        removed
    }

    /// Rebuild the chain from the entries `keep` accepts; returns how many
    /// were dropped. The chain is left untouched if nothing is rejected.
    pub(crate) fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let verdicts: Vec<bool> = self
            .nodes
            .iter_mut()
            .map(|e| keep(&e.key, &mut e.value))
            .collect();
        let dropped = verdicts.iter().filter(|k| !**k).count();
        if dropped == 0 {
            return 0;
        }
        let old = mem::take(&mut self.nodes);
        self.nodes = old
            .into_iter()
            .zip(verdicts)
            .filter_map(|(e, k)| k.then_some(e))
            .collect();
        dropped
    }

    /// Move the whole chain out, leaving the bucket empty. The slot is not
    /// touched; callers unlink it themselves.
    #[inline]
    pub(crate) fn take_entries(&mut self) -> Vec<Entry<K, V>> {
        mem::take(&mut self.nodes)
    }
}
