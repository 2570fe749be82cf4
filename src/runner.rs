//! Execution configuration and partitioned fan-out.
//!
//! A [`Runner`] is carried by every pipeline stage and aggregation view. It
//! records the requested [`ExecMode`] and, optionally, the [`TaskPool`] to run
//! on. Building a pipeline never touches threads; only terminals call
//! [`Runner::run_partitions`], which either runs a single partition inline or
//! submits one task per partition and blocks until all of them resolve.

use crate::error::PoolError;
use crate::pool::{TaskPool, is_worker_thread};
use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecMode {
    #[default]
    Sequential,
    Parallel { workers: usize },
}

impl ExecMode {
    /// Degree of concurrency: `1` for sequential execution.
    pub fn concurrency(self) -> usize {
        match self {
            ExecMode::Sequential => 1,
            ExecMode::Parallel { workers } => workers.max(1),
        }
    }
}

#[derive(Clone, Default)]
pub struct Runner {
    pub mode: ExecMode,
    pub pool: Option<Arc<TaskPool>>,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("mode", &self.mode)
            .field("pool_workers", &self.pool.as_ref().map(|p| p.workers()))
            .finish()
    }
}

impl Runner {
    pub fn sequential() -> Self {
        Self::default()
    }

    /// Parallel with `workers` partitions (`None` = hardware concurrency).
    pub fn parallel(workers: Option<usize>) -> Self {
        Self {
            mode: ExecMode::Parallel {
                workers: workers.unwrap_or_else(num_cpus::get).max(1),
            },
            pool: None,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.mode.concurrency()
    }

    /// Partitions a terminal will actually use.
    ///
    /// Parallel terminals issued from inside a pool worker run inline as a
    /// single partition so they never wait on tasks queued behind them.
    pub fn partitions(&self) -> usize {
        let n = self.concurrency();
        if n > 1 && is_worker_thread() {
            debug!(requested = n, "nested parallel terminal on a pool worker; running inline");
            return 1;
        }
        n
    }

    /// Run `task(i, partitions)` for every partition index and return the
    /// results in partition order.
    ///
    /// With a single partition the task runs on the calling thread. Otherwise
    /// each partition is submitted to the configured pool (or
    /// [`TaskPool::global`]) and the call blocks until every task resolves.
    /// The first failing partition's error is returned.
    pub(crate) fn run_partitions<A, F>(&self, partitions: usize, task: F) -> Result<Vec<A>>
    where
        A: Send + 'static,
        F: Fn(usize, usize) -> Result<A> + Send + Sync + 'static,
    {
        let partitions = partitions.max(1);
        if partitions == 1 {
            trace!("folding single partition inline");
            return Ok(vec![task(0, 1)?]);
        }

        let pool = match &self.pool {
            Some(p) => Arc::clone(p),
            None => TaskPool::global().context("starting the global task pool")?,
        };

        let task = Arc::new(task);
        let mut handles = Vec::with_capacity(partitions);
        for i in 0..partitions {
            let task = Arc::clone(&task);
            handles.push(pool.try_submit(move || {
                trace!(partition = i, of = partitions, "folding partition");
                task(i, partitions)
            })?);
        }

        let mut out = Vec::with_capacity(partitions);
        let mut first_err = None;
        for h in handles {
            match h.wait() {
                Ok(v) => out.push(v),
                Err(e) if first_err.is_none() => first_err = Some(unwrap_task_error(e)),
                Err(_) => {}
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(out),
        }
    }
}

/// Surface a task's own error unchanged rather than wrapped in `TaskFailed`.
fn unwrap_task_error(e: PoolError) -> anyhow::Error {
    match e {
        PoolError::TaskFailed(inner) => inner,
        other => anyhow::Error::new(other),
    }
}
