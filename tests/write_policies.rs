// ==============================================
// WRITE-PROPAGATION TESTS (integration)
// ==============================================
//
// End-to-end behavior of the three write disciplines against the in-memory
// store, built through the public builder.

use policykit::builder::CacheBuilder;
use policykit::policy::EvictionPolicy;
use policykit::store::{MemoryStore, MemoryStoreError};
use policykit::write::{WriteCache, WritePolicy};

type Controller = WriteCache<String, String, MemoryStore<String, String>>;

fn controller(capacity: usize, eviction: EvictionPolicy, policy: WritePolicy) -> Controller {
    CacheBuilder::new(capacity)
        .eviction(eviction)
        .write_policy(policy)
        .seed(7)
        .build(MemoryStore::new())
        .unwrap()
}

fn s(v: &str) -> String {
    v.to_string()
}

mod through {
    use super::*;

    #[test]
    fn store_holds_value_before_any_get() {
        let mut wc = controller(4, EvictionPolicy::Lru, WritePolicy::Through);
        wc.put(s("k"), s("v")).unwrap();
        assert_eq!(wc.store().get(&s("k")), Some(&s("v")));
        assert_eq!(wc.get(&s("k")).unwrap(), Some(s("v")));
        assert_eq!(wc.metrics().hits, 1);
    }

    #[test]
    fn failed_put_changes_nothing() {
        let mut wc = controller(4, EvictionPolicy::Fifo, WritePolicy::Through);
        wc.store_mut().fail_writes_for(s("k"));
        let err = wc.put(s("k"), s("v")).unwrap_err();
        assert!(matches!(err.as_store(), Some(MemoryStoreError::WriteRejected(_))));
        assert!(!wc.contains(&s("k")));
        assert!(!wc.store().contains(&s("k")));
    }

    #[test]
    fn evicted_key_is_refetched() {
        let mut wc = controller(2, EvictionPolicy::Fifo, WritePolicy::Through);
        for key in ["a", "b", "c"] {
            wc.put(s(key), key.to_uppercase()).unwrap();
        }
        assert!(!wc.contains(&s("a")));
        assert_eq!(wc.get(&s("a")).unwrap(), Some(s("A")));
        assert_eq!(wc.store().read_count(), 1);
    }
}

mod around {
    use super::*;

    #[test]
    fn second_put_clears_stale_copy() {
        let mut wc = controller(4, EvictionPolicy::Lru, WritePolicy::Around);
        wc.put(s("k"), s("v1")).unwrap();
        assert_eq!(wc.get(&s("k")).unwrap(), Some(s("v1")));

        wc.put(s("k"), s("v2")).unwrap();
        assert!(!wc.contains(&s("k")));
        assert_eq!(wc.get(&s("k")).unwrap(), Some(s("v2")));
    }

    #[test]
    fn writes_never_populate_cache() {
        let mut wc = controller(4, EvictionPolicy::Lfu, WritePolicy::Around);
        for i in 0..10 {
            wc.put(format!("k{i}"), format!("v{i}")).unwrap();
        }
        assert!(wc.cache().is_empty());
        assert_eq!(wc.store().len(), 10);
    }
}

mod back {
    use super::*;

    #[test]
    fn dirty_lifecycle() {
        let mut wc = controller(4, EvictionPolicy::Lru, WritePolicy::Back);
        wc.put(s("k"), s("v")).unwrap();
        assert!(wc.is_dirty(&s("k")));
        assert!(!wc.store().contains(&s("k")));

        assert_eq!(wc.flush().unwrap(), 1);
        assert!(!wc.is_dirty(&s("k")));
        assert_eq!(wc.store().get(&s("k")), Some(&s("v")));

        wc.put(s("k"), s("v2")).unwrap();
        assert!(wc.is_dirty(&s("k")));
        assert_eq!(wc.store().get(&s("k")), Some(&s("v")));
    }

    #[test]
    fn flush_twice_equals_flush_once() {
        let mut wc = controller(8, EvictionPolicy::Lfu, WritePolicy::Back);
        for i in 0..5 {
            wc.put(format!("k{i}"), format!("v{i}")).unwrap();
        }
        assert_eq!(wc.flush().unwrap(), 5);
        let store_after_one = wc.store().clone();
        let writes = wc.store().write_count();

        assert_eq!(wc.flush().unwrap(), 0);
        assert_eq!(wc.store().write_count(), writes);
        for i in 0..5 {
            let key = format!("k{i}");
            assert_eq!(wc.store().get(&key), store_after_one.get(&key));
        }
    }

    #[test]
    fn flush_continues_past_failing_entry() {
        let mut wc = controller(8, EvictionPolicy::Fifo, WritePolicy::Back);
        for key in ["a", "b", "c", "d"] {
            wc.put(s(key), s(key)).unwrap();
        }
        wc.store_mut().fail_writes_for(s("b"));

        let err = wc.flush().unwrap_err();
        assert_eq!(err.written, 3);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].0, s("b"));
        assert_eq!(wc.dirty_count(), 1);
        for key in ["a", "c", "d"] {
            assert_eq!(wc.store().get(&s(key)), Some(&s(key)));
        }
    }

    #[test]
    fn dirty_victims_are_written_back() {
        for eviction in EvictionPolicy::ALL {
            let mut wc = controller(2, eviction, WritePolicy::Back);
            for i in 0..6 {
                wc.put(format!("k{i}"), format!("v{i}")).unwrap();
            }
            wc.flush().unwrap();
            for i in 0..6 {
                let key = format!("k{i}");
                assert_eq!(
                    wc.store().get(&key),
                    Some(&format!("v{i}")),
                    "{eviction}: {key} lost"
                );
            }
            assert_eq!(wc.metrics().write_backs, 4, "{eviction}");
        }
    }

    #[test]
    fn miss_is_cached_clean() {
        let store = MemoryStore::with_data([(s("k"), s("v"))]);
        let mut wc = CacheBuilder::new(2)
            .write_policy(WritePolicy::Back)
            .build(store)
            .unwrap();
        assert_eq!(wc.get(&s("k")).unwrap(), Some(s("v")));
        assert!(wc.contains(&s("k")));
        assert!(!wc.is_dirty(&s("k")));
        assert_eq!(wc.flush().unwrap(), 0);
    }

    #[test]
    fn zero_capacity_lfu_keeps_acknowledged_writes() {
        let mut wc = controller(0, EvictionPolicy::Lfu, WritePolicy::Back);
        wc.put(s("k"), s("v")).unwrap();
        assert_eq!(wc.flush().unwrap(), 0);
        assert_eq!(wc.store().get(&s("k")), Some(&s("v")));
        assert_eq!(wc.get(&s("k")).unwrap(), Some(s("v")));
    }
}

mod shared {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_readers_and_writers() {
        let shared = CacheBuilder::new(32)
            .eviction(EvictionPolicy::Lru)
            .write_policy(WritePolicy::Back)
            .build_shared::<u64, u64, _>(MemoryStore::new())
            .unwrap();

        let writers: Vec<_> = (0..4u64)
            .map(|t| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        let key = t * 100 + i;
                        shared.put(key, key * 2).unwrap();
                        assert_eq!(shared.get(&key).unwrap(), Some(key * 2));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        shared.flush().unwrap();
        let guard = shared.lock();
        assert_eq!(guard.store().len(), 400);
        assert!(guard.cache().len() <= 32);
        assert_eq!(guard.dirty_count(), 0);
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn policy_strategy() -> impl Strategy<Value = EvictionPolicy> {
        prop::sample::select(EvictionPolicy::ALL.to_vec())
    }

    fn write_strategy() -> impl Strategy<Value = WritePolicy> {
        prop::sample::select(WritePolicy::ALL.to_vec())
    }

    proptest! {
        #[cfg_attr(miri, ignore)]
        #[test]
        fn reads_see_latest_write(
            eviction in policy_strategy(),
            policy in write_strategy(),
            capacity in 0usize..5,
            ops in prop::collection::vec((any::<bool>(), 0u8..8, any::<u16>()), 0..100),
        ) {
            // Only LFU accepts a zero capacity.
            let eviction = if capacity == 0 { EvictionPolicy::Lfu } else { eviction };
            let mut wc = CacheBuilder::new(capacity)
                .eviction(eviction)
                .write_policy(policy)
                .seed(1)
                .build::<u8, u16, _>(MemoryStore::new())
                .unwrap();
            let mut model: HashMap<u8, u16> = HashMap::new();

            for (is_put, key, value) in ops {
                if is_put {
                    wc.put(key, value).unwrap();
                    model.insert(key, value);
                } else {
                    prop_assert_eq!(wc.get(&key).unwrap(), model.get(&key).copied());
                }
                prop_assert!(wc.cache().len() <= capacity);
                prop_assert!(wc.cache().check_invariants().is_ok());
            }

            wc.flush().unwrap();
            for (key, value) in &model {
                prop_assert_eq!(wc.store().get(key), Some(value));
            }
        }
    }
}
