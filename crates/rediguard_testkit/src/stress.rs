//! Stress helpers for rediguard.
//!
//! These verify behavior under concurrent access: lock exclusion across
//! many clients, and counters under contention and connection loss.

use crate::faults::FaultInjector;
use rediguard_core::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
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

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads, each with its own client.
    pub threads: usize,
    /// Lock TTL in seconds for lock tests.
    pub lock_ttl: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 200,
            threads: 4,
            lock_ttl: 30,
        }
    }
}

/// Outcome of a lock contention run.
#[derive(Debug, Clone)]
pub struct ContentionResult {
    /// Acquire attempts that succeeded (`successful_ops`) or found the lock
    /// busy (`failed_ops`).
    pub stats: StressTestResult,
    /// Highest number of threads observed inside the critical section at
    /// once. Exclusion holds when this is at most 1.
    pub max_concurrent_holders: usize,
}

/// Has every client repeatedly take, hold and release one shared lock.
///
/// Clients should share a store and a clock that does not move, so that no
/// record ever goes stale during the run.
pub fn stress_lock_contention(
    clients: Vec<Client>,
    lock_name: &str,
    config: &StressConfig,
) -> ContentionResult {
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));
    let acquired = Arc::new(AtomicUsize::new(0));
    let busy = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let handles: Vec<_> = clients
        .into_iter()
        .map(|client| {
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            let acquired = Arc::clone(&acquired);
            let busy = Arc::clone(&busy);
            let lock_name = lock_name.to_string();
            let operations = config.operations;
            let ttl = config.lock_ttl;

            thread::spawn(move || {
                for _ in 0..operations {
                    match client.lock(&lock_name, ttl) {
                        Ok(true) => {
                            let now_inside = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_inside.fetch_max(now_inside, Ordering::SeqCst);
                            thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                            client.unlock(&lock_name).expect("Failed to release lock");
                            acquired.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(false) => {
                            busy.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => panic!("lock attempt failed: {e}"),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    ContentionResult {
        stats: StressTestResult::new(
            acquired.load(Ordering::Relaxed),
            busy.load(Ordering::Relaxed),
            start.elapsed(),
        ),
        max_concurrent_holders: max_inside.load(Ordering::SeqCst),
    }
}

/// Has every thread increment one counter through a shared client.
pub fn stress_shared_counter(client: Arc<Client>, name: &str, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let client = Arc::clone(&client);
            let name = name.to_string();
            let operations = config.operations;
            thread::spawn(move || {
                let mut ok = 0usize;
                let mut failed = 0usize;
                for _ in 0..operations {
                    match client.inc(&name, 1) {
                        Ok(_) => ok += 1,
                        Err(_) => failed += 1,
                    }
                }
                (ok, failed)
            })
        })
        .collect();

    let (mut successful, mut failed) = (0, 0);
    for handle in handles {
        let (ok, err) = handle.join().expect("Thread panicked");
        successful += ok;
        failed += err;
    }
    StressTestResult::new(successful, failed, start.elapsed())
}

/// Writes keys while the server drops connections every `drop_every`
/// operations. Returns the write statistics.
pub fn stress_writes_with_disconnects(
    client: &Client,
    faults: &FaultInjector,
    config: &StressConfig,
    drop_every: usize,
) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        if drop_every > 0 && i % drop_every == 0 {
            faults.drop_connections(1);
        }
        match client.set(&format!("key_{i}"), i as i64, None) {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}
