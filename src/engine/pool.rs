//! Bounded worker pool for batch requests.

use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::warn;

use crate::error::{EngineError, Result};

/// Result of one task in a batch, tagged with its key.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome<K, T> {
    /// Key the task was submitted under.
    pub key: K,
    /// Task result; a panic surfaces as `WorkerPool`.
    pub result: Result<T>,
}

/// Dedicated rayon pool; tasks in a batch never affect each other.
#[derive(Debug)]
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    /// Build a pool with `threads` workers; 0 picks one per core.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("anofox-worker-{i}"))
            .build()
            .map_err(|e| EngineError::WorkerPool(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `task` on every input, preserving input order in the output.
    pub fn run<I, K, T, F>(&self, inputs: Vec<I>, key: impl Fn(&I) -> K + Sync, task: F) -> Vec<BatchOutcome<K, T>>
    where
        I: Send,
        K: Send,
        T: Send,
        F: Fn(I) -> Result<T> + Sync,
    {
        self.pool.install(|| {
            inputs
                .into_par_iter()
                .map(|input| {
                    let k = key(&input);
                    let result = catch_unwind(AssertUnwindSafe(|| task(input))).unwrap_or_else(|payload| {
                        let message = panic_message(payload.as_ref());
                        warn!(panic = %message, "batch task panicked");
                        Err(EngineError::WorkerPool(format!("task panicked: {message}")))
                    });
                    BatchOutcome { key: k, result }
                })
                .collect()
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
