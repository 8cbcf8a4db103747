//! Property tests against the brute-force `ReferenceModel`.
//!
//! - the engine agrees with the model for random histories and targets
//! - prefix containment: prefix-mode results start with the target
//! - directional correctness: Smaller < target < Larger, result visible
//! - residency transparency: tiered and purely resident indexes agree
//! - visibility monotonicity: later commits never change an earlier read

use proptest::prelude::*;

use nearseek::{
    CommitTarget, Key, MemoryIndex, NearSearch, Payload, SearchResult, Snapshot, TieredIndex,
    Timestamp,
};

use crate::common::ReferenceModel;

#[derive(Debug, Clone)]
enum Step {
    Commit(Vec<(Vec<u8>, bool)>),
    Evict,
}

fn key_bytes(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(
        prop_oneof![Just(b'a'), Just(b'b'), Just(b'c'), Just(0xffu8)],
        0..=max_len,
    )
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        5 => proptest::collection::btree_map(key_bytes(3), any::<bool>(), 1..5)
            .prop_map(|m| Step::Commit(m.into_iter().collect())),
        1 => Just(Step::Evict),
    ]
}

struct Harness {
    _dir: tempfile::TempDir,
    tiered: TieredIndex,
    memory: MemoryIndex,
    model: ReferenceModel,
    ts: u64,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let tiered = TieredIndex::open(dir.path()).unwrap();
        Harness {
            _dir: dir,
            tiered,
            memory: MemoryIndex::new(),
            model: ReferenceModel::new(),
            ts: 0,
        }
    }

    fn apply(&mut self, step: &Step) {
        match step {
            Step::Commit(writes) => {
                self.ts += 10;
                let writes: Vec<(Key, Payload)> = writes
                    .iter()
                    .map(|(k, tomb)| {
                        let payload = if *tomb {
                            Payload::Tombstone
                        } else {
                            Payload::Value(k.clone())
                        };
                        (Key::new(k.clone()), payload)
                    })
                    .collect();
                self.tiered.commit(&writes, Timestamp::new(self.ts)).unwrap();
                self.memory.commit(&writes, Timestamp::new(self.ts)).unwrap();
                self.model.commit(&writes, self.ts);
            }
            Step::Evict => {
                self.tiered.evict().unwrap();
            }
        }
    }
}

fn search(index: &dyn nearseek::VersionedIndex, target: &Key, read_ts: u64, prefix: bool) -> SearchResult {
    NearSearch::new(index, Snapshot::from(read_ts))
        .search_near(target, prefix)
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn engine_matches_reference_model(
        steps in proptest::collection::vec(step_strategy(), 1..10),
        target in key_bytes(3),
        read_offset in 0u64..120,
        prefix in any::<bool>(),
    ) {
        let mut h = Harness::new();
        for step in &steps {
            h.apply(step);
        }
        let target = Key::new(target);
        let read_ts = (h.ts + 5).saturating_sub(read_offset);

        let expected = h.model.search_near(&target, read_ts, prefix);
        let tiered = search(&h.tiered, &target, read_ts, prefix);
        let memory = search(&h.memory, &target, read_ts, prefix);

        prop_assert_eq!(&tiered, &expected);
        prop_assert_eq!(&memory, &expected);

        match &tiered {
            SearchResult::Exact(k) => prop_assert_eq!(k, &target),
            SearchResult::Smaller(k) => prop_assert!(*k < target),
            SearchResult::Larger(k) => prop_assert!(*k > target),
            SearchResult::NotFound => {
                if !prefix {
                    prop_assert!(h.model.visible_keys(read_ts).is_empty());
                }
            }
        }
        if let Some(k) = tiered.key() {
            prop_assert!(h.model.is_visible(k, read_ts));
            if prefix {
                prop_assert!(k.starts_with(target.as_bytes()));
            }
        }
    }

    #[test]
    fn later_commits_do_not_change_earlier_reads(
        before in proptest::collection::vec(step_strategy(), 1..6),
        after in proptest::collection::vec(step_strategy(), 1..6),
        targets in proptest::collection::vec(key_bytes(3), 1..6),
        prefix in any::<bool>(),
    ) {
        let mut h = Harness::new();
        for step in &before {
            h.apply(step);
        }
        let read_ts = h.ts;
        let targets: Vec<Key> = targets.into_iter().map(Key::new).collect();
        let seen: Vec<SearchResult> = targets
            .iter()
            .map(|t| search(&h.tiered, t, read_ts, prefix))
            .collect();

        for step in &after {
            h.apply(step);
        }
        let again: Vec<SearchResult> = targets
            .iter()
            .map(|t| search(&h.tiered, t, read_ts, prefix))
            .collect();
        prop_assert_eq!(seen, again);
    }
}
