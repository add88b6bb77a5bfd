#![cfg(test)]

// Property tests for ChainedHashMap kept inside the crate so they can check
// structural invariants (chain/index bookkeeping) after every step.

use crate::chained_hash_map::ChainedHashMap;
use crate::error::KeyNotFound;
use crate::tunables::DEFAULT_CAPACITY;
use core::hash::BuildHasher;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hasher;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    DefaultAccess(usize),
    Remove(usize),
    Find(usize),
    At(usize),
    Contains(String),
    Mutate(usize, i32),
    Retain(u8),
    Clear,
    CloneCompare,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            2 => idx.clone().prop_map(Op::DefaultAccess),
            3 => idx.clone().prop_map(Op::Remove),
            1 => idx.clone().prop_map(Op::Find),
            1 => idx.clone().prop_map(Op::At),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(Op::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => (2u8..5).prop_map(Op::Retain),
            1 => Just(Op::Clear),
            1 => Just(Op::CloneCompare),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn retain_rule(k: &Key, m: u8) -> bool {
    k.0.len() % m as usize != 0
}

// State-machine harness over ChainedHashMap against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Uniqueness and first-write-wins on duplicate inserts.
// - Default-insert access adds exactly one entry when the key is absent.
// - `find`/`get`/`at`/`contains_key` parity with the model.
// - Iteration yields exactly `len()` distinct keys equal to the model's key set.
// - Capacity never decreases except through `clear`, which resets it.
// - Clones compare equal and pass the structural checks. A clone re-inserts
//   through the growth policy, so its traversal order is not compared with
//   the source and its capacity never exceeds the source's.
// - Structural invariants (chain lengths, FilledIndex contents) after each op.
fn run_state_machine<S>(
    mut sut: ChainedHashMap<Key, i32, S>,
    pool: Vec<String>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher + Clone,
{
    let mut model: HashMap<Key, i32> = HashMap::new();

    for op in ops {
        let cap_before = sut.capacity();
        let mut cleared = false;
        match op {
            Op::Insert(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                let inserted = sut.insert(k.clone(), v);
                prop_assert_eq!(inserted, !already);
                model.entry(k).or_insert(v);
            }
            Op::DefaultAccess(i) => {
                let k = key_from(&pool, i);
                let len_before = sut.len();
                let already = model.contains_key(&k);
                let got = *sut.get_or_insert_default(k.clone());
                let expected = *model.entry(k).or_default();
                prop_assert_eq!(got, expected);
                prop_assert_eq!(sut.len(), len_before + usize::from(!already));
            }
            Op::Remove(i) => {
                let k = key_from(&pool, i);
                let removed = sut.remove(&k);
                prop_assert_eq!(removed, model.remove(&k));
                prop_assert!(sut.find(&k).is_end());
                prop_assert_eq!(sut.capacity(), cap_before);
            }
            Op::Find(i) => {
                let k = key_from(&pool, i);
                let c = sut.find(&k);
                prop_assert_eq!(c.entry(), model.get_key_value(&k));
            }
            Op::At(i) => {
                let k = key_from(&pool, i);
                match model.get(&k) {
                    Some(v) => prop_assert_eq!(sut.at(&k), Ok(v)),
                    None => prop_assert_eq!(sut.at(&k), Err(KeyNotFound)),
                }
            }
            Op::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            Op::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(vr) = sut.get_mut(&k) {
                    *vr = vr.saturating_add(d);
                }
                if let Some(mv) = model.get_mut(&k) {
                    *mv = mv.saturating_add(d);
                }
            }
            Op::Retain(m) => {
                sut.retain(|k, _| retain_rule(k, m));
                model.retain(|k, _| retain_rule(k, m));
                prop_assert_eq!(sut.capacity(), cap_before);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
                cleared = true;
                prop_assert_eq!(sut.capacity(), DEFAULT_CAPACITY);
            }
            Op::CloneCompare => {
                let copy = sut.clone();
                copy.check_invariants();
                prop_assert!(copy == sut);
                prop_assert_eq!(copy.len(), sut.len());
                prop_assert!(copy.capacity() <= sut.capacity());
            }
            Op::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(sut.iter().count(), sut.len());
                prop_assert_eq!(s_keys, m_keys);
                for (k, v) in &sut {
                    prop_assert_eq!(model.get(k), Some(v));
                }
            }
        }

        // Post-conditions after each op
        sut.check_invariants();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        if !cleared {
            prop_assert!(sut.capacity() >= cap_before, "capacity shrank");
        }
        prop_assert!(sut.capacity() >= DEFAULT_CAPACITY);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(ChainedHashMap::new(), pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: same state machine under worst-case collisions (one chain holds
// everything, and every grow re-links a single bucket).
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(ChainedHashMap::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}

// Property: growth happens exactly when the load trigger fires, and doubles.
proptest! {
    #[test]
    fn prop_growth_doubles_on_trigger(keys in proptest::collection::vec(any::<u32>(), 1..200)) {
        let mut m: ChainedHashMap<u32, ()> = ChainedHashMap::new();
        for k in keys {
            let cap = m.capacity();
            let inserted = m.insert(k, ());
            let triggered = inserted && m.len() * 2 >= cap;
            if triggered {
                prop_assert_eq!(m.capacity(), cap * 2);
            } else {
                prop_assert_eq!(m.capacity(), cap);
            }
        }
        m.check_invariants();
    }
}
