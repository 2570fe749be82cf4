//! Fixed-size worker pool used to fan partitioned folds out across threads.
//!
//! A [`TaskPool`] owns `n` worker threads that pull boxed jobs from a single
//! mutex-guarded queue, parking on a condition variable while the queue is
//! empty. [`TaskPool::submit`] returns a [`TaskHandle`], a blocking future that
//! yields the task's value or the [`PoolError`] describing why there is none.
//!
//! - Panics inside a task are caught on the worker and delivered through the
//!   handle as [`PoolError::TaskPanicked`]; workers never die.
//! - [`TaskPool::shutdown`] stops accepting work, lets the workers drain the
//!   queue, and joins them. It is idempotent and also runs on `Drop`.
//! - [`TaskPool::global`] is a lazily created process-wide pool. Pipelines only
//!   fall back to it when no explicit pool was configured via
//!   [`Semantic::with_pool`](crate::Semantic::with_pool).
//!
//! ```ignore
//! use semflow::pool::TaskPool;
//!
//! let pool = TaskPool::new(4)?;
//! let handle = pool.submit(|| 21 * 2)?;
//! assert_eq!(handle.wait()?, 42);
//! pool.shutdown();
//! assert!(pool.submit(|| 1).is_err());
//! # anyhow::Result::<()>::Ok(())
//! ```

use crate::error::{PoolError, PoolResult};
use std::cell::Cell;
use std::collections::VecDeque;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    static IN_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// `true` when the calling thread is a worker of some [`TaskPool`].
///
/// Parallel terminals use this to run inline instead of blocking a worker on
/// work queued behind it.
pub fn is_worker_thread() -> bool {
    IN_WORKER.with(Cell::get)
}

struct PoolState {
    queue: VecDeque<Job>,
    stopping: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    available: Condvar,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A fixed-size pool of worker threads.
pub struct TaskPool {
    shared: Arc<Shared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

static GLOBAL: Mutex<Option<Arc<TaskPool>>> = Mutex::new(None);

impl TaskPool {
    /// Start a pool with `workers` threads (at least one).
    ///
    /// # Errors
    /// Returns the OS error if a worker thread cannot be spawned.
    pub fn new(workers: usize) -> io::Result<Self> {
        let size = workers.max(1);
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                stopping: false,
            }),
            available: Condvar::new(),
        });

        let mut handles = Vec::with_capacity(size);
        for i in 0..size {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("semflow-worker-{i}"))
                .spawn(move || worker_loop(&shared))?;
            handles.push(handle);
        }
        debug!(workers = size, "task pool started");

        Ok(Self {
            shared,
            handles: Mutex::new(handles),
            size,
        })
    }

    /// The lazily created process-wide pool, sized to the hardware concurrency.
    ///
    /// A global pool that was shut down is replaced by a fresh one on the
    /// next call.
    ///
    /// # Errors
    /// Returns the OS error if the pool has to be created and spawning fails.
    pub fn global() -> io::Result<Arc<TaskPool>> {
        let mut slot = lock(&GLOBAL);
        if let Some(pool) = slot.as_ref().filter(|p| !p.is_stopped()) {
            return Ok(Arc::clone(pool));
        }
        let pool = Arc::new(TaskPool::new(num_cpus::get())?);
        *slot = Some(Arc::clone(&pool));
        Ok(pool)
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.size
    }

    /// Jobs queued but not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        lock(&self.shared.state).queue.len()
    }

    /// Whether `shutdown` has been requested.
    pub fn is_stopped(&self) -> bool {
        lock(&self.shared.state).stopping
    }

    /// Queue `task` and return a handle to its result.
    ///
    /// # Errors
    /// [`PoolError::Stopped`] if the pool is shutting down or stopped.
    pub fn submit<T, F>(&self, task: F) -> PoolResult<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.try_submit(move || Ok(task()))
    }

    /// Queue a fallible task; an `Err` is delivered as [`PoolError::TaskFailed`].
    ///
    /// # Errors
    /// [`PoolError::Stopped`] if the pool is shutting down or stopped.
    pub fn try_submit<T, F>(&self, task: F) -> PoolResult<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        let slot = Arc::new(Slot::new());
        let completer = Completer {
            slot: Some(Arc::clone(&slot)),
        };
        self.enqueue(Box::new(move || {
            let outcome = match catch_unwind(AssertUnwindSafe(task)) {
                Ok(Ok(v)) => Ok(v),
                Ok(Err(e)) => Err(PoolError::TaskFailed(e)),
                Err(payload) => Err(PoolError::from_panic(payload)),
            };
            completer.complete(outcome);
        }))?;
        Ok(TaskHandle { slot })
    }

    /// Queue `task`; a panic or error is passed to `on_error` on the worker
    /// instead of the handle, which then yields `None`.
    ///
    /// # Errors
    /// [`PoolError::Stopped`] if the pool is shutting down or stopped.
    pub fn submit_with_handler<T, F, H>(&self, task: F, on_error: H) -> PoolResult<TaskHandle<Option<T>>>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        H: FnOnce(PoolError) + Send + 'static,
    {
        self.submit(move || {
            let failure = match catch_unwind(AssertUnwindSafe(task)) {
                Ok(Ok(v)) => return Some(v),
                Ok(Err(e)) => PoolError::TaskFailed(e),
                Err(payload) => PoolError::from_panic(payload),
            };
            warn!(error = %failure, "pool task failed; routing to error handler");
            on_error(failure);
            None
        })
    }

    fn enqueue(&self, job: Job) -> PoolResult<()> {
        let mut st = lock(&self.shared.state);
        if st.stopping {
            return Err(PoolError::Stopped);
        }
        st.queue.push_back(job);
        drop(st);
        self.shared.available.notify_one();
        Ok(())
    }

    /// Stop accepting work, let workers drain the queue, and join them.
    ///
    /// Safe to call more than once and from any thread, including a worker of
    /// this pool (which is then not joined).
    pub fn shutdown(&self) {
        {
            let mut st = lock(&self.shared.state);
            st.stopping = true;
        }
        self.shared.available.notify_all();

        let handles: Vec<JoinHandle<()>> = lock(&self.handles).drain(..).collect();
        if handles.is_empty() {
            return;
        }
        let me = thread::current().id();
        for h in handles {
            if h.thread().id() == me {
                continue;
            }
            let _ = h.join();
        }
        debug!(workers = self.size, "task pool stopped");
    }
}

impl Default for TaskPool {
    /// A pool sized to the hardware concurrency.
    ///
    /// # Panics
    /// Panics if the OS refuses to spawn threads; use [`TaskPool::new`] to
    /// handle that case.
    fn default() -> Self {
        TaskPool::new(num_cpus::get()).unwrap_or_else(|e| panic!("failed to spawn task pool: {e}"))
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &Shared) {
    IN_WORKER.with(|f| f.set(true));
    loop {
        let job = {
            let mut st = lock(&shared.state);
            loop {
                if let Some(job) = st.queue.pop_front() {
                    break job;
                }
                if st.stopping {
                    return;
                }
                st = shared
                    .available
                    .wait(st)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        job();
    }
}

struct Slot<T> {
    result: Mutex<Option<PoolResult<T>>>,
    done: Condvar,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn fill(&self, outcome: PoolResult<T>) {
        *lock(&self.result) = Some(outcome);
        self.done.notify_all();
    }
}

/// Fills the slot exactly once; reports `Disconnected` if dropped unfilled.
struct Completer<T> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Completer<T> {
    fn complete(mut self, outcome: PoolResult<T>) {
        if let Some(slot) = self.slot.take() {
            slot.fill(outcome);
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.fill(Err(PoolError::Disconnected));
        }
    }
}

/// Blocking handle to the result of a submitted task.
#[must_use = "a task handle does nothing unless waited on"]
pub struct TaskHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task finishes.
    ///
    /// # Errors
    /// The [`PoolError`] describing a panic, a failed task, or a lost task.
    pub fn wait(self) -> PoolResult<T> {
        let mut guard = lock(&self.slot.result);
        loop {
            if let Some(outcome) = guard.take() {
                return outcome;
            }
            guard = self
                .slot
                .done
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block for at most `timeout`. On expiry the task keeps running but its
    /// result is discarded.
    ///
    /// # Errors
    /// [`PoolError::Timeout`] on expiry, otherwise as [`TaskHandle::wait`].
    pub fn wait_timeout(self, timeout: Duration) -> PoolResult<T> {
        let guard = lock(&self.slot.result);
        let (mut guard, _) = self
            .slot
            .done
            .wait_timeout_while(guard, timeout, |r| r.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        guard.take().unwrap_or(Err(PoolError::Timeout(timeout)))
    }

    /// Whether a result (or error) is ready.
    pub fn is_finished(&self) -> bool {
        lock(&self.slot.result).is_some()
    }
}
