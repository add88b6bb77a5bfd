//! FilledIndex: arrival-ordered list of occupied bucket indices.
//!
//! Links live in a `SlotMap`, so each position is addressed by a generational
//! `Slot` handle. A bucket keeps the `Slot` it was given on `push_back` and
//! hands it back on `remove`; unlinking is O(1) and never scans. Handles stay
//! valid while other positions are added or removed, and a removed handle
//! never resolves again even if its storage is reused.

use slotmap::{DefaultKey, SlotMap};

/// Position of one bucket index inside a `FilledIndex`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Slot(DefaultKey);

#[derive(Debug)]
struct Link {
    bucket: usize,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

#[derive(Debug, Default)]
pub(crate) struct FilledIndex {
    links: SlotMap<DefaultKey, Link>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl FilledIndex {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            links: SlotMap::with_capacity_and_key(capacity),
            head: None,
            tail: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Append `bucket` at the back and return the handle that removes it.
    pub(crate) fn push_back(&mut self, bucket: usize) -> Slot {
        let prev = self.tail;
        let k = self.links.insert(Link {
            bucket,
            prev,
            next: None,
        });
        match prev {
            Some(p) => {
                if let Some(link) = self.links.get_mut(p) {
                    link.next = Some(k);
                }
            }
            None => self.head = Some(k),
        }
        self.tail = Some(k);
        Slot(k)
    }

    /// Unlink the position behind `slot`, returning the bucket index it held.
    /// Stale handles return `None` and leave the list untouched.
    pub(crate) fn remove(&mut self, slot: Slot) -> Option<usize> {
        let link = self.links.remove(slot.0)?;
        match link.prev {
            Some(p) => {
                if let Some(l) = self.links.get_mut(p) {
                    l.next = link.next;
                }
            }
            None => self.head = link.next,
        }
        match link.next {
            Some(n) => {
                if let Some(l) = self.links.get_mut(n) {
                    l.prev = link.prev;
                }
            }
            None => self.tail = link.prev,
        }
        Some(link.bucket)
    }

    /// Bucket index at the front, i.e. the oldest still-occupied bucket.
    pub(crate) fn first(&self) -> Option<usize> {
        self.head.and_then(|k| self.links.get(k)).map(|l| l.bucket)
    }

    /// Bucket index following the one behind `slot`.
    pub(crate) fn next_after(&self, slot: Slot) -> Option<usize> {
        self.links
            .get(slot.0)
            .and_then(|l| l.next)
            .and_then(|k| self.links.get(k))
            .map(|l| l.bucket)
    }

    #[cfg(test)]
    pub(crate) fn bucket_of(&self, slot: Slot) -> Option<usize> {
        self.links.get(slot.0).map(|l| l.bucket)
    }

    pub(crate) fn clear(&mut self) {
        self.links.clear();
        self.head = None;
        self.tail = None;
    }

    /// Occupied bucket indices, front to back.
    pub(crate) fn iter(&self) -> Buckets<'_> {
        Buckets {
            index: self,
            cur: self.head,
            remaining: self.links.len(),
        }
    }
}

/// Iterator over bucket indices in arrival order.
pub(crate) struct Buckets<'a> {
    index: &'a FilledIndex,
    cur: Option<DefaultKey>,
    remaining: usize,
}

impl<'a> Iterator for Buckets<'a> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        let link = self.index.links.get(self.cur?)?;
        self.cur = link.next;
        self.remaining -= 1;
        Some(link.bucket)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Buckets<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(ix: &FilledIndex) -> Vec<usize> {
        ix.iter().collect()
    }

    /// Invariant: iteration follows push order.
    #[test]
    fn push_back_preserves_arrival_order() {
        let mut ix = FilledIndex::new();
        assert!(ix.is_empty());
        assert_eq!(ix.first(), None);
        for b in [5, 1, 7, 3] {
            ix.push_back(b);
        }
        assert_eq!(ix.len(), 4);
        assert_eq!(ix.first(), Some(5));
        assert_eq!(order(&ix), vec![5, 1, 7, 3]);
    }

    /// Invariant: removing head, middle and tail via their slots relinks neighbours.
    #[test]
    fn remove_by_slot_relinks() {
        let mut ix = FilledIndex::with_capacity(8);
        let s0 = ix.push_back(0);
        let s1 = ix.push_back(1);
        let s2 = ix.push_back(2);
        let s3 = ix.push_back(3);

        assert_eq!(ix.remove(s1), Some(1));
        assert_eq!(order(&ix), vec![0, 2, 3]);
        assert_eq!(ix.next_after(s0), Some(2));

        assert_eq!(ix.remove(s0), Some(0));
        assert_eq!(ix.first(), Some(2));
        assert_eq!(order(&ix), vec![2, 3]);

        assert_eq!(ix.remove(s3), Some(3));
        assert_eq!(ix.next_after(s2), None);
        assert_eq!(order(&ix), vec![2]);

        // Appending after removing the tail must link behind the new tail.
        ix.push_back(9);
        assert_eq!(order(&ix), vec![2, 9]);
    }

    /// Invariant: a removed slot never resolves, even after its storage is reused.
    #[test]
    fn stale_slot_is_inert() {
        let mut ix = FilledIndex::new();
        let s = ix.push_back(4);
        assert_eq!(ix.remove(s), Some(4));
        let s_new = ix.push_back(6);
        assert_ne!(s, s_new);
        assert_eq!(ix.remove(s), None);
        assert_eq!(ix.next_after(s), None);
        assert_eq!(order(&ix), vec![6]);
    }

    #[test]
    fn clear_empties() {
        let mut ix = FilledIndex::new();
        ix.push_back(1);
        ix.push_back(2);
        ix.clear();
        assert!(ix.is_empty());
        assert_eq!(ix.first(), None);
        assert_eq!(ix.iter().len(), 0);
        ix.push_back(3);
        assert_eq!(order(&ix), vec![3]);
    }
}
