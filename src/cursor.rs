//! Cursors and iterators over a `ChainedHashMap`.
//!
//! Every traversal walks occupied buckets in `FilledIndex` order (the order
//! in which buckets first became non-empty) and each chain front to back. A
//! position is the pair (bucket index, offset in chain); the end of the walk
//! is represented by no position at all. Because cursors and iterators borrow
//! the map, nothing can grow the table or rebuild a chain while one is alive.

use crate::bucket::{Bucket, Entry};
use crate::filled_index::{FilledIndex, Slot};
use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Position {
    pub(crate) bucket: usize,
    pub(crate) offset: usize,
}

impl Position {
    #[inline]
    pub(crate) fn new(bucket: usize, offset: usize) -> Self {
        Self { bucket, offset }
    }
}

/// First position of a walk, or `None` for an empty map.
#[inline]
pub(crate) fn first(filled: &FilledIndex) -> Option<Position> {
    filled.first().map(|b| Position::new(b, 0))
}

/// Step past `pos`, given the length and index slot of its bucket. Buckets
/// listed in the index are never empty, so the successor bucket always has
/// an entry at offset 0.
#[inline]
pub(crate) fn advance(
    pos: Position,
    chain_len: usize,
    slot: Option<Slot>,
    filled: &FilledIndex,
) -> Option<Position> {
    if pos.offset + 1 < chain_len {
        return Some(Position::new(pos.bucket, pos.offset + 1));
    }
    filled.next_after(slot?).map(|b| Position::new(b, 0))
}

/// Read-only cursor. Either points at an entry or sits at the end.
pub struct Cursor<'a, K, V> {
    buckets: &'a [Bucket<K, V>],
    filled: &'a FilledIndex,
    pos: Option<Position>,
}

impl<'a, K, V> Cursor<'a, K, V> {
    pub(crate) fn new(
        buckets: &'a [Bucket<K, V>],
        filled: &'a FilledIndex,
        pos: Option<Position>,
    ) -> Self {
        Self {
            buckets,
            filled,
            pos,
        }
    }

    #[inline]
    fn current(&self) -> Option<&'a Entry<K, V>> {
        let pos = self.pos?;
        self.buckets.get(pos.bucket)?.get(pos.offset)
    }

    /// True once the cursor has walked past the last entry, or when a lookup
    /// found nothing.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.pos.is_none()
    }

    pub fn key(&self) -> Option<&'a K> {
        self.current().map(Entry::key)
    }

    pub fn value(&self) -> Option<&'a V> {
        self.current().map(|e| &e.value)
    }

    pub fn entry(&self) -> Option<(&'a K, &'a V)> {
        self.current().map(Entry::pair)
    }

    /// Move to the next entry. At the end this is a no-op.
    pub fn move_next(&mut self) {
        if let Some(pos) = self.pos {
            self.pos = match self.buckets.get(pos.bucket) {
                Some(b) => advance(pos, b.len(), b.slot(), self.filled),
                None => None,
            };
        }
    }
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Cursor<'_, K, V> {}

/// Cursors are equal when they walk the same map and sit on the same
/// position (or are both at the end).
impl<K, V> PartialEq for Cursor<'_, K, V> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.buckets, other.buckets) && self.pos == other.pos
    }
}

impl<K, V> Eq for Cursor<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Cursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.entry()).finish()
    }
}

/// Cursor with mutable access to values. Keys stay read-only.
pub struct CursorMut<'a, K, V> {
    buckets: &'a mut [Bucket<K, V>],
    filled: &'a FilledIndex,
    pos: Option<Position>,
}

impl<'a, K, V> CursorMut<'a, K, V> {
    pub(crate) fn new(
        buckets: &'a mut [Bucket<K, V>],
        filled: &'a FilledIndex,
        pos: Option<Position>,
    ) -> Self {
        Self {
            buckets,
            filled,
            pos,
        }
    }

    #[inline]
    fn current_mut(&mut self) -> Option<&mut Entry<K, V>> {
        let pos = self.pos?;
        self.buckets.get_mut(pos.bucket)?.get_mut(pos.offset)
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.pos.is_none()
    }

    pub fn key(&self) -> Option<&K> {
        self.as_cursor().key()
    }

    pub fn value(&self) -> Option<&V> {
        self.as_cursor().value()
    }

    pub fn value_mut(&mut self) -> Option<&mut V> {
        self.current_mut().map(|e| &mut e.value)
    }

    pub fn entry_mut(&mut self) -> Option<(&K, &mut V)> {
        self.current_mut().map(Entry::pair_mut)
    }

    /// Give up the cursor and keep the borrow of the current value.
    pub fn into_value_mut(self) -> Option<&'a mut V> {
        let pos = self.pos?;
        self.buckets
            .get_mut(pos.bucket)?
            .get_mut(pos.offset)
            .map(|e| &mut e.value)
    }

    pub fn move_next(&mut self) {
        if let Some(pos) = self.pos {
            self.pos = match self.buckets.get(pos.bucket) {
                Some(b) => advance(pos, b.len(), b.slot(), self.filled),
                None => None,
            };
        }
    }

    /// Read-only view of the same position.
    pub fn as_cursor(&self) -> Cursor<'_, K, V> {
        Cursor::new(&*self.buckets, self.filled, self.pos)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for CursorMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CursorMut")
            .field(&self.as_cursor().entry())
            .finish()
    }
}

/// Iterator over `(&K, &V)` in traversal order.
pub struct Iter<'a, K, V> {
    cursor: Cursor<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(cursor: Cursor<'a, K, V>, len: usize) -> Self {
        Self {
            cursor,
            remaining: len,
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor,
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.cursor.entry()?;
        self.cursor.move_next();
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// Iterator over `(&K, &mut V)` in traversal order.
pub struct IterMut<'a, K, V> {
    // Base of the bucket array. Buckets are only ever touched through
    // `Vec::as_mut_ptr` on their chain, never as whole-slice references.
    buckets: NonNull<Bucket<K, V>>,
    filled: &'a FilledIndex,
    pos: Option<Position>,
    remaining: usize,
    _marker: PhantomData<&'a mut Bucket<K, V>>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(
        buckets: &'a mut [Bucket<K, V>],
        filled: &'a FilledIndex,
        len: usize,
    ) -> Self {
        Self {
            buckets: NonNull::from(buckets).cast(),
            filled,
            pos: first(filled),
            remaining: len,
            _marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.pos?;
        // Safety: `pos.bucket` comes from the map's FilledIndex, so it is in
        // bounds of the bucket array borrowed for 'a. The index lists each
        // bucket once and offsets only increase within a bucket, so every
        // entry pointer produced here is distinct and no two yielded `&mut V`
        // alias. The bucket itself is only reborrowed for the duration of
        // the `entry_ptr` call, which does not create a reference to the
        // chain's other elements.
        let entry: &'a mut Entry<K, V> = unsafe {
            let bucket = &mut *self.buckets.as_ptr().add(pos.bucket);
            self.pos = advance(pos, bucket.len(), bucket.slot(), self.filled);
            &mut *bucket.entry_ptr(pos.offset)
        };
        self.remaining -= 1;
        Some(entry.pair_mut())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

// Safety: IterMut behaves like `&'a mut [Bucket<K, V>]` handing out `&K` and
// `&mut V`, matching the bounds std uses for its map iterators.
unsafe impl<K: Sync, V: Send> Send for IterMut<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for IterMut<'_, K, V> {}

/// Owning iterator, yielding pairs in the traversal order the map had.
pub struct IntoIter<K, V> {
    inner: std::vec::IntoIter<Entry<K, V>>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(entries: Vec<Entry<K, V>>) -> Self {
        Self {
            inner: entries.into_iter(),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next().map(Entry::into_pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

/// Removes every entry from the map; see `ChainedHashMap::drain`.
pub struct Drain<'a, K, V> {
    inner: IntoIter<K, V>,
    _marker: PhantomData<&'a mut (K, V)>,
}

impl<K, V> Drain<'_, K, V> {
    pub(crate) fn new(entries: Vec<Entry<K, V>>) -> Self {
        Self {
            inner: IntoIter::new(entries),
            _marker: PhantomData,
        }
    }
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Drain<'_, K, V> {}
impl<K, V> FusedIterator for Drain<'_, K, V> {}

pub struct Keys<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct Values<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct ValuesMut<'a, K, V> {
    pub(crate) inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

pub struct IntoKeys<K, V> {
    pub(crate) inner: IntoIter<K, V>,
}

impl<K, V> Iterator for IntoKeys<K, V> {
    type Item = K;

    #[inline]
    fn next(&mut self) -> Option<K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoKeys<K, V> {}
impl<K, V> FusedIterator for IntoKeys<K, V> {}

pub struct IntoValues<K, V> {
    pub(crate) inner: IntoIter<K, V>,
}

impl<K, V> Iterator for IntoValues<K, V> {
    type Item = V;

    #[inline]
    fn next(&mut self) -> Option<V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoValues<K, V> {}
impl<K, V> FusedIterator for IntoValues<K, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    // Two buckets, linked in the order 2 then 0.
    fn fixture() -> (Vec<Bucket<u32, u32>>, FilledIndex) {
        let mut buckets: Vec<Bucket<u32, u32>> = (0..4).map(|_| Bucket::default()).collect();
        let mut filled = FilledIndex::new();
        for (b, keys) in [(2usize, [20u32, 21]), (0, [0, 1])] {
            buckets[b].set_slot(filled.push_back(b));
            for k in keys {
                buckets[b].push(Entry::new(k, k * 10, 0));
            }
        }
        (buckets, filled)
    }

    /// Invariant: advancing stays in the chain, then follows the index, then ends.
    #[test]
    fn advance_walks_chain_then_index() {
        let (buckets, filled) = fixture();
        let mut c = Cursor::new(&buckets, &filled, first(&filled));
        let mut seen = Vec::new();
        while let Some(k) = c.key() {
            seen.push(*k);
            c.move_next();
        }
        assert_eq!(seen, vec![20, 21, 0, 1]);
        assert!(c.is_end());
        c.move_next();
        assert!(c.is_end());
        assert_eq!(c.entry(), None);
    }

    /// Invariant: cursors compare by map identity and position.
    #[test]
    fn cursor_equality() {
        let (buckets, filled) = fixture();
        let a = Cursor::new(&buckets, &filled, first(&filled));
        let mut b = a;
        assert_eq!(a, b);
        b.move_next();
        assert_ne!(a, b);
        let end1 = Cursor::new(&buckets, &filled, None);
        let end2 = Cursor::new(&buckets, &filled, None);
        assert_eq!(end1, end2);
    }

    /// Invariant: IterMut visits every entry once, in the same order as Iter,
    /// and its writes are visible afterwards.
    #[test]
    fn iter_mut_matches_iter_order() {
        let (mut buckets, filled) = fixture();
        let order: Vec<u32> = Iter::new(Cursor::new(&buckets, &filled, first(&filled)), 4)
            .map(|(k, _)| *k)
            .collect();
        let mut touched = Vec::new();
        let it = IterMut::new(&mut buckets, &filled, 4);
        assert_eq!(it.len(), 4);
        for (k, v) in it {
            touched.push(*k);
            *v += 1;
        }
        assert_eq!(touched, order);
        let values: Vec<u32> = Iter::new(Cursor::new(&buckets, &filled, first(&filled)), 4)
            .map(|(_, v)| *v)
            .collect();
        assert_eq!(values, vec![201, 211, 1, 11]);
    }

    /// Invariant: key/value adapters are exact-size, fused and (when shared)
    /// cloneable like the iterators they wrap.
    #[test]
    fn adapters_are_exact_fused_and_cloneable() {
        fn fused<I: FusedIterator + ExactSizeIterator>(it: I) -> I {
            it
        }

        let (mut buckets, filled) = fixture();
        let iter = || Iter::new(Cursor::new(&buckets, &filled, first(&filled)), 4);

        let mut keys = fused(Keys { inner: iter() });
        assert_eq!(keys.next(), Some(&20));
        let rest = keys.clone();
        assert_eq!(rest.len(), 3);
        assert_eq!(keys.by_ref().copied().collect::<Vec<_>>(), vec![21, 0, 1]);
        assert_eq!(keys.next(), None);
        assert_eq!(rest.copied().collect::<Vec<_>>(), vec![21, 0, 1]);

        let values = fused(Values { inner: iter() });
        assert_eq!(values.clone().count(), 4);
        assert_eq!(values.copied().collect::<Vec<_>>(), vec![200, 210, 0, 10]);

        let mut values_mut = fused(ValuesMut {
            inner: IterMut::new(&mut buckets, &filled, 4),
        });
        assert_eq!(values_mut.len(), 4);
        for v in values_mut.by_ref() {
            *v += 1;
        }
        assert_eq!(values_mut.next(), None);

        let entries = || {
            vec![
                Entry::new(1u32, 10u32, 0),
                Entry::new(2, 20, 0),
                Entry::new(3, 30, 0),
            ]
        };
        let mut into_keys = fused(IntoKeys {
            inner: IntoIter::new(entries()),
        });
        assert_eq!(into_keys.len(), 3);
        assert_eq!(into_keys.by_ref().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(into_keys.next(), None);
        let into_values = fused(IntoValues {
            inner: IntoIter::new(entries()),
        });
        assert_eq!(into_values.len(), 3);
        assert_eq!(into_values.collect::<Vec<_>>(), vec![10, 20, 30]);
    }

    #[test]
    fn cursor_mut_into_value_mut() {
        let (mut buckets, filled) = fixture();
        let pos = first(&filled);
        let mut c = CursorMut::new(&mut buckets, &filled, pos);
        c.move_next();
        assert_eq!(c.key(), Some(&21));
        *c.into_value_mut().unwrap() = 7;
        assert_eq!(buckets[2].get(1).unwrap().value, 7);
    }
}
