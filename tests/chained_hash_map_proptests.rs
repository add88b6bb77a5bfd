// ChainedHashMap property tests (public API).
//
// Property 1: observable behavior matches a first-write-wins model.
//  - Model: std HashMap where insert only fills vacant keys.
//  - Invariant: len() == model.len(); get(k) == model.get(k) for every
//    key in the domain; iteration yields each model entry exactly once.
//  - Operations: insert, default-insert, remove, at.
//
// Property 2: traversal order is a pure function of the operation sequence.
//  - Two maps fed the same sequence iterate identically.
//  - A clone re-inserts through the growth policy: it is logically equal to
//    its source and never larger, but its order is its own.
//
// Property 3: grow preserves contents.
//  - Whenever an insert changes capacity, the new capacity is exactly
//    double and every previously present entry is still found.
use chained_hashmap::{ChainedHashMap, KeyNotFound, DEFAULT_CAPACITY};
use proptest::prelude::*;
use std::collections::HashMap;

// Property 1: model parity under first-write-wins semantics.
proptest! {
    #[test]
    fn prop_matches_first_write_wins_model(
        domain in 1u16..=40,
        ops in proptest::collection::vec((0u8..=3u8, 0u16..1000u16, any::<i64>()), 1..200),
    ) {
        let mut m: ChainedHashMap<u16, i64> = ChainedHashMap::new();
        let mut model: HashMap<u16, i64> = HashMap::new();

        for (op, raw_k, v) in ops {
            let k = raw_k % domain;
            match op {
                // Insert never overwrites.
                0 => {
                    let vacant = !model.contains_key(&k);
                    prop_assert_eq!(m.insert(k, v), vacant);
                    model.entry(k).or_insert(v);
                }
                // Default-insert grows len by one only for a missing key.
                1 => {
                    let before = m.len();
                    let got = *m.get_or_insert_default(k);
                    let expected = *model.entry(k).or_default();
                    prop_assert_eq!(got, expected);
                    prop_assert_eq!(m.len() - before, usize::from(before < model.len()));
                }
                // Remove is a no-op on absent keys and never shrinks.
                2 => {
                    let cap = m.capacity();
                    prop_assert_eq!(m.remove(&k), model.remove(&k));
                    prop_assert_eq!(m.capacity(), cap);
                    prop_assert!(m.find(&k).is_end());
                }
                // Bounds-checked access.
                _ => match model.get(&k) {
                    Some(v) => prop_assert_eq!(m.at(&k), Ok(v)),
                    None => prop_assert_eq!(m.at(&k), Err(KeyNotFound)),
                },
            }
            prop_assert_eq!(m.len(), model.len());
        }

        for k in 0..domain {
            prop_assert_eq!(m.get(&k), model.get(&k));
        }
        let mut seen: Vec<(u16, i64)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        seen.sort_unstable();
        let mut expected: Vec<(u16, i64)> = model.into_iter().collect();
        expected.sort_unstable();
        prop_assert_eq!(seen, expected);
    }
}

// Property 2: deterministic traversal order; clones are equal, not ordered alike.
proptest! {
    #[test]
    fn prop_traversal_order_is_deterministic(
        ops in proptest::collection::vec((any::<bool>(), 0u32..64u32), 1..150),
    ) {
        let mut a: ChainedHashMap<u32, u32> = ChainedHashMap::new();
        let mut b: ChainedHashMap<u32, u32> = ChainedHashMap::new();
        for (insert, k) in ops {
            if insert {
                a.insert(k, k);
                b.insert(k, k);
            } else {
                a.remove(&k);
                b.remove(&k);
            }
        }
        let oa: Vec<u32> = a.keys().copied().collect();
        let ob: Vec<u32> = b.keys().copied().collect();
        prop_assert_eq!(&oa, &ob);

        let c = a.clone();
        prop_assert!(c == a);
        prop_assert_eq!(c.iter().len(), a.len());
        prop_assert!(c.capacity() >= DEFAULT_CAPACITY);
        prop_assert!(c.capacity() <= a.capacity());
    }
}

// Property 3: every grow doubles and keeps all entries.
proptest! {
    #[test]
    fn prop_grow_preserves_contents(keys in proptest::collection::vec(any::<u64>(), 1..300)) {
        let mut m: ChainedHashMap<u64, u64> = ChainedHashMap::new();
        let mut inserted: Vec<u64> = Vec::new();
        for k in keys {
            let cap = m.capacity();
            if m.insert(k, k ^ 0x5555) {
                inserted.push(k);
            }
            if m.capacity() != cap {
                prop_assert_eq!(m.capacity(), cap * 2);
                for p in &inserted {
                    prop_assert_eq!(m.get(p), Some(&(p ^ 0x5555)));
                }
            }
        }
        prop_assert_eq!(m.len(), inserted.len());
        prop_assert_eq!(m.iter().count(), inserted.len());
    }
}
