//! Stress runs for the store.
//!
//! Each run performs a fixed number of operations and reports how many
//! succeeded, how many failed and how long they took.

use crate::fixtures::quiet_options;
use relstore_core::{Entity, RelationshipOptions, Store};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of distinct entities.
    pub entity_count: usize,
    /// Number of distinct values of the indexed `bucket` property.
    pub buckets: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            entity_count: 1_000,
            buckets: 16,
        }
    }
}

/// Creates a store with `Item { id }`, an index on `bucket` and a UNIQUE
/// constraint on `code`.
pub fn stress_store() -> Store {
    let store = Store::with_options(quiet_options());
    store
        .register_entity("Item")
        .primary_key("id")
        .index(&["bucket"])
        .unique(&["code"])
        .finish()
        .expect("Failed to register Item");
    store
}

fn item(index: usize, config: &StressConfig) -> Entity {
    let id = (index % config.entity_count) as i64;
    Entity::new("Item")
        .with("id", id)
        .with("bucket", (index % config.buckets) as i64)
        .with("code", format!("code-{id}"))
}

fn populate(store: &Store, config: &StressConfig) {
    store
        .add_all((0..config.entity_count).map(|i| item(i, config)))
        .expect("Failed to populate");
}

/// Run a sequential insert stress test.
pub fn stress_sequential_inserts(store: &Store, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        match store.add_one(item(i, config)) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run an indexed lookup stress test.
pub fn stress_indexed_lookups(store: &Store, config: &StressConfig) -> StressTestResult {
    populate(store, config);

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let bucket = (i % config.buckets) as i64;
        match store.find_all_by("Item", &["bucket"], &[bucket.into()]) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a mixed insert, lookup and remove stress test.
pub fn stress_mixed_operations(store: &Store, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let entity = item(i, config);
        let result = match i % 3 {
            0 => store.add_one(entity).map(|_| ()),
            1 => store
                .find_all_by("Item", &["bucket"], &[entity.get("bucket").clone()])
                .map(|_| ()),
            _ => store.remove_one(&entity).map(|_| ()),
        };

        match result {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a stress test where every other insert violates the UNIQUE
/// constraint on `code`.
pub fn stress_constraint_rejections(store: &Store, config: &StressConfig) -> StressTestResult {
    store
        .add_one(Entity::new("Item").with("id", -1).with("code", "taken"))
        .expect("Failed to add seed item");

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let mut entity = item(i, config);
        if i % 2 == 0 {
            entity.set("code", "taken");
        }
        match store.add_one(entity) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a concurrent read stress test.
pub fn stress_concurrent_reads(store: Arc<Store>, config: &StressConfig) -> StressTestResult {
    populate(&store, config);

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads;

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = Arc::clone(&store);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let entity_count = config.entity_count;

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let key = ((t * ops_per_thread + i) % entity_count) as i64;
                    if store.find_one("Item", key).is_some() {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run a concurrent write stress test. Threads write disjoint key ranges.
pub fn stress_concurrent_writes(store: Arc<Store>, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads;

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = Arc::clone(&store);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let id = (t * ops_per_thread + i) as i64;
                    let entity = Entity::new("Item")
                        .with("id", id)
                        .with("bucket", id % 16)
                        .with("code", format!("code-{id}"));
                    match store.add_one(entity) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run a cascade stress test: each operation adds an owner with `fanout`
/// cascading children, then removes the owner.
pub fn stress_cascade_removals(config: &StressConfig, fanout: usize) -> StressTestResult {
    let store = Store::with_options(quiet_options());
    store
        .register_entity("Child")
        .primary_key("id")
        .finish()
        .expect("Failed to register Child");
    store
        .register_entity("Owner")
        .primary_key("id")
        .relationship("children", "Child", RelationshipOptions::new().cascade(true))
        .finish()
        .expect("Failed to register Owner");

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let owner = Entity::new("Owner").with("id", i as i64);
        let children =
            (0..fanout).map(|c| Entity::new("Child").with("id", format!("{i}-{c}")));
        let result = store.add_one(owner.clone()).and_then(|_| {
            store.relationship(&owner, "children")?.extend(children)?;
            store.remove_one(&owner)
        });

        match result {
            Ok(true) if store.count("Child") == 0 => successful += 1,
            _ => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}
