//! Walks each write policy through the same sequence of operations.
//!
//! Run with: `RUST_LOG=policykit=debug cargo run --example write_policies`

use policykit::builder::CacheBuilder;
use policykit::policy::EvictionPolicy;
use policykit::store::MemoryStore;
use policykit::write::WritePolicy;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    for policy in WritePolicy::ALL {
        let mut store: MemoryStore<String, u32> = MemoryStore::new();
        store.fail_writes_for("poison".to_string());

        let mut wc = CacheBuilder::new(3)
            .eviction(EvictionPolicy::Lfu)
            .write_policy(policy)
            .build(&mut store)
            .expect("capacity 3 is valid");

        for (i, key) in ["alpha", "beta", "gamma", "delta", "poison"].iter().enumerate() {
            if let Err(err) = wc.put(key.to_string(), i as u32) {
                info!(%policy, key, error = %err, "put failed");
            }
        }
        for key in ["alpha", "delta", "missing"] {
            let value = wc.get(&key.to_string()).expect("reads do not fail here");
            info!(%policy, key, ?value, "get");
        }
        match wc.flush() {
            Ok(written) => info!(%policy, written, "flushed"),
            Err(err) => info!(
                %policy,
                written = err.written,
                still_dirty = err.failures.len(),
                "partial flush"
            ),
        }

        let metrics = wc.metrics();
        info!(
            %policy,
            hits = metrics.hits,
            misses = metrics.misses,
            store_writes = metrics.store_writes,
            write_backs = metrics.write_backs,
            "done"
        );
        drop(wc);
        info!(%policy, stored = store.len(), "store contents after run");
    }
}
