//! ChainedHashMap: bucket array, collision chains and the FilledIndex.

use crate::bucket::{Bucket, Entry};
use crate::cfg::trace;
use crate::cursor::{
    self, Cursor, CursorMut, Drain, IntoIter, IntoKeys, IntoValues, Iter, IterMut, Keys, Position,
    Values, ValuesMut,
};
use crate::error::KeyNotFound;
use crate::filled_index::FilledIndex;
use crate::tunables::Tunables;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use std::sync::Arc;

/// A hash map with one collision chain per bucket.
///
/// Iteration visits buckets in the order they first became occupied, and
/// each chain in insertion order; it never touches empty buckets. The bucket
/// count doubles when `len * enlarge_coaf >= capacity` after an insert and is
/// never reduced by `remove`. Growth settings are shared by every map of the
/// same concrete type; see [`Tunables`].
pub struct ChainedHashMap<K, V, S = DefaultHashBuilder> {
    hasher: S,
    buckets: Vec<Bucket<K, V>>,
    filled: FilledIndex,
    len: usize,
    tunables: Arc<Tunables>,
}

fn new_buckets<K, V>(capacity: usize) -> Vec<Bucket<K, V>> {
    let mut buckets = Vec::with_capacity(capacity);
    buckets.resize_with(capacity, Bucket::default);
    buckets
}

impl<K, V> ChainedHashMap<K, V>
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V, S> ChainedHashMap<K, V, S>
where
    K: Eq + Hash + 'static,
    V: 'static,
    S: BuildHasher + 'static,
{
    pub fn with_hasher(hasher: S) -> Self {
        let tunables = Tunables::of::<Self>();
        let capacity = tunables.default_capacity();
        Self {
            hasher,
            buckets: new_buckets(capacity),
            filled: FilledIndex::with_capacity(capacity),
            len: 0,
            tunables,
        }
    }

    /// Build from pairs in order; the first occurrence of a key wins.
    pub fn from_iter_with_hasher<I>(iter: I, hasher: S) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::with_hasher(hasher);
        map.extend(iter);
        map
    }

    /// Growth settings shared by every `ChainedHashMap<K, V, S>`.
    pub fn tunables() -> Arc<Tunables> {
        Tunables::of::<Self>()
    }
}

impl<K, V, S> ChainedHashMap<K, V, S> {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current bucket count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// The hasher builder used for every lookup.
    #[inline]
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Cursor at the first entry, or at the end for an empty map.
    pub fn cursor(&self) -> Cursor<'_, K, V> {
        Cursor::new(&self.buckets, &self.filled, cursor::first(&self.filled))
    }

    pub fn cursor_mut(&mut self) -> CursorMut<'_, K, V> {
        let pos = cursor::first(&self.filled);
        CursorMut::new(&mut self.buckets, &self.filled, pos)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.cursor(), self.len)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.buckets, &self.filled, self.len)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    pub fn into_keys(self) -> IntoKeys<K, V> {
        IntoKeys {
            inner: self.into_iter(),
        }
    }

    pub fn into_values(self) -> IntoValues<K, V> {
        IntoValues {
            inner: self.into_iter(),
        }
    }

    /// Remove every entry, yielding them in traversal order. The bucket
    /// count is kept.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        Drain::new(self.take_in_order())
    }

    /// Remove every entry and reset the bucket count to the current
    /// `default_capacity`.
    pub fn clear(&mut self) {
        let capacity = self.tunables.default_capacity();
        trace!(len = self.len, capacity, "clear");
        self.buckets.clear();
        self.buckets.resize_with(capacity, Bucket::default);
        self.filled.clear();
        self.len = 0;
    }

    /// Keep only the entries for which `keep` returns true. Each affected
    /// chain is rebuilt; the bucket count is unchanged.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let occupied: Vec<usize> = self.filled.iter().collect();
        for b in occupied {
            let bucket = &mut self.buckets[b];
            self.len -= bucket.retain(&mut keep);
            if bucket.is_empty() {
                if let Some(slot) = bucket.take_slot() {
                    self.filled.remove(slot);
                }
            }
        }
    }

    #[inline]
    fn bucket_index(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    /// Move every entry out in traversal order and leave the buckets empty at
    /// their current count.
    fn take_in_order(&mut self) -> Vec<Entry<K, V>> {
        let mut entries = Vec::with_capacity(self.len);
        for b in self.filled.iter() {
            let bucket = &mut self.buckets[b];
            entries.extend(bucket.take_entries());
            bucket.take_slot();
        }
        self.filled.clear();
        self.len = 0;
        entries
    }

    /// Link `entry` into its bucket without checking for duplicates or
    /// evaluating the growth trigger.
    fn push_entry(&mut self, entry: Entry<K, V>) -> Position {
        let b = self.bucket_index(entry.hash());
        let bucket = &mut self.buckets[b];
        if bucket.is_empty() {
            bucket.set_slot(self.filled.push_back(b));
        }
        let offset = bucket.push(entry);
        self.len += 1;
        Position::new(b, offset)
    }

    /// Rebuild the whole table at `new_capacity`, re-inserting every entry in
    /// traversal order. Returns where the entry at `track` ended up.
    fn grow(&mut self, new_capacity: usize, track: Position) -> Position {
        trace!(
            old_capacity = self.capacity(),
            new_capacity,
            len = self.len,
            "grow"
        );
        let mut entries = Vec::with_capacity(self.len);
        let mut tracked = None;
        for b in self.filled.iter() {
            if b == track.bucket {
                tracked = Some(entries.len() + track.offset);
            }
            entries.extend(self.buckets[b].take_entries());
        }
        self.filled.clear();
        self.len = 0;
        self.buckets = new_buckets(new_capacity);

        let mut moved = track;
        for (i, entry) in entries.into_iter().enumerate() {
            let pos = self.push_entry(entry);
            if tracked == Some(i) {
                moved = pos;
            }
        }
        debug_assert!(tracked.is_some(), "tracked entry not found during grow");
        moved
    }

    /// Growth trigger, evaluated once per successful insert.
    fn grow_if_needed(&mut self, pos: Position) -> Position {
        if self.tunables.should_grow(self.len, self.capacity()) {
            let doubled = self.capacity().saturating_mul(2);
            self.grow(doubled, pos)
        } else {
            pos
        }
    }

    #[inline]
    fn entry_at(&self, pos: Position) -> Option<&Entry<K, V>> {
        self.buckets.get(pos.bucket)?.get(pos.offset)
    }

    #[inline]
    fn entry_at_mut(&mut self, pos: Position) -> Option<&mut Entry<K, V>> {
        self.buckets.get_mut(pos.bucket)?.get_mut(pos.offset)
    }
}

impl<K, V, S> ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    #[inline]
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    fn locate<Q>(&self, hash: u64, q: &Q) -> Option<Position>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let b = self.bucket_index(hash);
        self.buckets[b]
            .position(hash, q)
            .map(|offset| Position::new(b, offset))
    }

    /// Cursor at the entry for `q`, or the end cursor when absent.
    pub fn find<Q>(&self, q: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let pos = self.locate(self.make_hash(q), q);
        Cursor::new(&self.buckets, &self.filled, pos)
    }

    pub fn find_mut<Q>(&mut self, q: &Q) -> CursorMut<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let pos = self.locate(self.make_hash(q), q);
        CursorMut::new(&mut self.buckets, &self.filled, pos)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.locate(self.make_hash(q), q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let pos = self.locate(self.make_hash(q), q)?;
        self.entry_at(pos).map(|e| &e.value)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let pos = self.locate(self.make_hash(q), q)?;
        self.entry_at(pos).map(Entry::pair)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let pos = self.locate(self.make_hash(q), q)?;
        self.entry_at_mut(pos).map(|e| &mut e.value)
    }

    /// Bounds-checked access.
    pub fn at<Q>(&self, q: &Q) -> Result<&V, KeyNotFound>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(q).ok_or(KeyNotFound)
    }

    pub fn at_mut<Q>(&mut self, q: &Q) -> Result<&mut V, KeyNotFound>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_mut(q).ok_or(KeyNotFound)
    }

    /// Insert `key -> value` unless `key` is already present. Returns whether
    /// the pair was inserted; on `false` the map is unchanged and the given
    /// pair is dropped.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let hash = self.make_hash(&key);
        if self.locate(hash, &key).is_some() {
            return false;
        }
        let pos = self.push_entry(Entry::new(key, value, hash));
        self.grow_if_needed(pos);
        true
    }

    /// Value for `key`, inserting `default()` first if the key is absent.
    /// `default` only runs on insert.
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let hash = self.make_hash(&key);
        let pos = match self.locate(hash, &key) {
            Some(pos) => pos,
            None => {
                let pos = self.push_entry(Entry::new(key, default(), hash));
                self.grow_if_needed(pos)
            }
        };
        self.buckets[pos.bucket].value_mut(pos.offset)
    }

    /// Bracket-style access: the value for `key`, inserting `V::default()`
    /// if absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Remove `q`, returning its value. Absent keys are a no-op. The bucket
    /// count is never reduced.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let pos = self.locate(self.make_hash(q), q)?;
        let bucket = &mut self.buckets[pos.bucket];
        let entry = bucket.remove_at(pos.offset)?;
        self.len -= 1;
        if bucket.is_empty() {
            if let Some(slot) = bucket.take_slot() {
                self.filled.remove(slot);
            }
        }
        debug_assert_eq!(self.filled.is_empty(), self.len == 0);
        Some(entry.into_pair())
    }

    /// Check structural invariants; used by tests after every step.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let mut total = 0;
        let mut occupied = 0;
        for (b, bucket) in self.buckets.iter().enumerate() {
            total += bucket.len();
            match bucket.slot() {
                Some(slot) => {
                    assert!(!bucket.is_empty(), "empty bucket {b} still linked");
                    assert_eq!(self.filled.bucket_of(slot), Some(b));
                    occupied += 1;
                }
                None => assert!(bucket.is_empty(), "bucket {b} not linked"),
            }
            for i in 0..bucket.len() {
                let e = bucket.get(i).expect("offset in range");
                assert_eq!(self.bucket_index(e.hash()), b, "entry in wrong bucket");
                assert_eq!(self.make_hash(e.key()), e.hash(), "stale cached hash");
                for j in (i + 1)..bucket.len() {
                    let other = bucket.get(j).expect("offset in range");
                    assert!(other.key() != e.key(), "duplicate key");
                }
            }
        }
        assert_eq!(total, self.len, "len out of sync with chains");
        assert_eq!(occupied, self.filled.len(), "index holds stale buckets");
        assert_eq!(self.filled.iter().count(), occupied);
        assert!(self.capacity() >= 1);
    }
}

impl<K, V, S> Clone for ChainedHashMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Independent copy built by re-inserting every entry in traversal order
    /// into a fresh table, so the bucket count follows the growth policy
    /// rather than the source's layout.
    fn clone(&self) -> Self {
        let capacity = self.tunables.default_capacity();
        let mut out = Self {
            hasher: self.hasher.clone(),
            buckets: new_buckets(capacity),
            filled: FilledIndex::with_capacity(capacity),
            len: 0,
            tunables: Arc::clone(&self.tunables),
        };
        for (k, v) in self.iter() {
            out.insert(k.clone(), v.clone());
        }
        trace!(len = out.len, capacity = out.capacity(), "clone");
        out
    }

    fn clone_from(&mut self, source: &Self) {
        self.hasher = source.hasher.clone();
        self.clear();
        for (k, v) in source.iter() {
            self.insert(k.clone(), v.clone());
        }
    }
}

impl<K, V, S> Default for ChainedHashMap<K, V, S>
where
    K: Eq + Hash + 'static,
    V: 'static,
    S: BuildHasher + Default + 'static,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> PartialEq for ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    /// Same key/value pairs, regardless of bucket count or traversal order.
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| v == ov))
    }
}

impl<K, V, S> Eq for ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> fmt::Debug for ChainedHashMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, S> Extend<(&'a K, &'a V)> for ChainedHashMap<K, V, S>
where
    K: Eq + Hash + Copy,
    V: Copy,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(*k, *v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for ChainedHashMap<K, V, S>
where
    K: Eq + Hash + 'static,
    V: 'static,
    S: BuildHasher + Default + 'static,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_iter_with_hasher(iter, S::default())
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for ChainedHashMap<K, V>
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    /// Pairs are inserted in array order; for repeated keys the first wins.
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainedHashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut ChainedHashMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S> IntoIterator for ChainedHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(mut self) -> Self::IntoIter {
        IntoIter::new(self.take_in_order())
    }
}
