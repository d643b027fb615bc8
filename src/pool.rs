//!
//! Fixed-size worker pool used by the estimation and classification drivers
//!
//! * `run_jobs` evaluates one job per index and returns the results in index order.
//! * `run_chunked` splits `0..n` into one contiguous range per slot and hands each
//!   slot (a per-thread accumulator or scratch buffer) to exactly one job.
//! * `run_group` runs heterogeneous closures behind a single barrier.
//!
//! All three wait for every job of the group. The first error is returned and
//! jobs that start after a failure are skipped.
//!
use crate::error::{HmmError, Result};
use rayon::prelude::*;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

///
/// Worker pool. `ThreadPool::sequential()` (or `new(1)`) runs everything on the
/// calling thread.
///
pub struct ThreadPool {
    pool: Option<rayon::ThreadPool>,
    n_threads: usize,
}

impl ThreadPool {
    pub fn new(n_threads: usize) -> Result<Self> {
        if n_threads <= 1 {
            return Ok(ThreadPool::sequential());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| HmmError::ThreadPool(e.to_string()))?;
        Ok(ThreadPool {
            pool: Some(pool),
            n_threads,
        })
    }
    pub fn sequential() -> Self {
        ThreadPool {
            pool: None,
            n_threads: 1,
        }
    }
    pub fn n_threads(&self) -> usize {
        self.n_threads
    }
    ///
    /// Index of the worker executing the caller, `0` outside of the pool.
    ///
    pub fn thread_id(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_thread_index().unwrap_or(0),
            None => 0,
        }
    }
    ///
    /// Run `f(i)` for `i in 0..n_jobs` and collect the results in index order.
    ///
    pub fn run_jobs<T, F>(&self, n_jobs: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send,
    {
        let group = JobGroup::new();
        let results: Vec<Option<T>> = match &self.pool {
            Some(pool) => pool.install(|| {
                (0..n_jobs)
                    .into_par_iter()
                    .map(|i| group.run(|| f(i)))
                    .collect()
            }),
            None => (0..n_jobs).map(|i| group.run(|| f(i))).collect(),
        };
        group.wait()?;
        results
            .into_iter()
            .collect::<Option<Vec<T>>>()
            .ok_or_else(|| HmmError::ThreadPool("job was skipped".to_owned()))
    }
    ///
    /// Split `0..n_items` into `slots.len()` contiguous ranges and run
    /// `f(slot_id, &mut slots[slot_id], range)` once per slot.
    ///
    /// Each slot is owned by a single job, so accumulators need no locking and
    /// merging them in slot order afterwards is deterministic.
    ///
    pub fn run_chunked<S, F>(&self, n_items: usize, slots: &mut [S], f: F) -> Result<()>
    where
        S: Send,
        F: Fn(usize, &mut S, Range<usize>) -> Result<()> + Sync + Send,
    {
        let n_slots = slots.len();
        if n_slots == 0 {
            return if n_items == 0 {
                Ok(())
            } else {
                Err(HmmError::ThreadPool("no slots for chunked jobs".to_owned()))
            };
        }
        let group = JobGroup::new();
        let job = |(slot_id, slot): (usize, &mut S)| {
            let range = chunk_range(n_items, n_slots, slot_id);
            group.run(|| f(slot_id, slot, range));
        };
        match &self.pool {
            Some(pool) => pool.install(|| slots.par_iter_mut().enumerate().for_each(job)),
            None => slots.iter_mut().enumerate().for_each(job),
        };
        group.wait()
    }
    ///
    /// Run a set of independent closures and wait for all of them.
    ///
    pub fn run_group<'a>(&self, jobs: Vec<Box<dyn FnOnce() -> Result<()> + Send + 'a>>) -> Result<()> {
        let group = JobGroup::new();
        match &self.pool {
            Some(pool) => pool.install(|| {
                rayon::scope(|s| {
                    for job in jobs {
                        let group = &group;
                        s.spawn(move |_| {
                            group.run(job);
                        });
                    }
                })
            }),
            None => {
                for job in jobs {
                    group.run(job);
                }
            }
        }
        group.wait()
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        ThreadPool::sequential()
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ThreadPool(n_threads={})", self.n_threads)
    }
}

///
/// `slot_id`-th of `n_slots` contiguous ranges covering `0..n_items`.
///
pub fn chunk_range(n_items: usize, n_slots: usize, slot_id: usize) -> Range<usize> {
    let size = (n_items + n_slots - 1) / n_slots;
    let start = (slot_id * size).min(n_items);
    let end = ((slot_id + 1) * size).min(n_items);
    start..end
}

///
/// Synchronization barrier of a batch of jobs.
///
/// Remembers the first error; once a job has failed, jobs started afterwards
/// are skipped.
///
#[derive(Debug, Default)]
pub struct JobGroup {
    failed: AtomicBool,
    error: Mutex<Option<HmmError>>,
}

impl JobGroup {
    pub fn new() -> Self {
        JobGroup::default()
    }
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }
    ///
    /// Run a job unless the group already failed.
    /// `None` is returned for skipped or failed jobs.
    ///
    pub fn run<T, F>(&self, f: F) -> Option<T>
    where
        F: FnOnce() -> Result<T>,
    {
        if self.has_failed() {
            return None;
        }
        match f() {
            Ok(value) => Some(value),
            Err(e) => {
                self.failed.store(true, Ordering::Release);
                let mut slot = self.error.lock().unwrap_or_else(|e| e.into_inner());
                if slot.is_none() {
                    *slot = Some(e);
                }
                None
            }
        }
    }
    ///
    /// Consume the group and return the first error if any.
    ///
    pub fn wait(self) -> Result<()> {
        let error = self.error.into_inner().unwrap_or_else(|e| e.into_inner());
        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
