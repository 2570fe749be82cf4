//! Execution metrics for a single terminal call.
//!
//! [`Collectable::collect_with_metrics`](crate::Collectable::collect_with_metrics)
//! returns an [`ExecutionMetrics`] snapshot next to the result: how the fold
//! was executed, how many partitions ran, how many elements they folded and
//! how long the call took. Snapshots serialize with `serde` and can be
//! printed or saved as JSON.
//!
//! # Example
//!
//! ```no_run
//! use semflow::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let (sum, metrics) = range(0u64, 1_000).parallel_with(4).collect_with_metrics(Sum::<u64>::new())?;
//! assert_eq!(sum, 499_500);
//! assert_eq!(metrics.elements, 1_000);
//! metrics.print();
//! metrics.save_to_file("metrics.json")?;
//! # Ok(())
//! # }
//! ```

use crate::runner::ExecMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    /// `"sequential"` or `"parallel"`.
    pub mode: String,
    /// Requested concurrency degree.
    pub workers: usize,
    /// Partitions that actually ran (1 when run inline).
    pub partitions: usize,
    /// Elements passed to the combiner across all partitions.
    pub elements: usize,
    pub elapsed_ms: f64,
}

impl ExecutionMetrics {
    pub(crate) fn new(mode: ExecMode, partitions: usize, elements: usize, elapsed: Duration) -> Self {
        let name = match mode {
            ExecMode::Sequential => "sequential",
            ExecMode::Parallel { .. } => "parallel",
        };
        Self {
            mode: name.to_string(),
            workers: mode.concurrency(),
            partitions,
            elements,
            elapsed_ms: elapsed.as_secs_f64() * 1_000.0,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        json!(self)
    }

    /// Print the snapshot to stdout in a human-readable format.
    pub fn print(&self) {
        println!("\n========== Execution Metrics ==========");
        println!("Mode: {} ({} workers)", self.mode, self.workers);
        println!("Partitions: {}", self.partitions);
        println!("Elements: {}", self.elements);
        println!("Elapsed: {:.3} ms", self.elapsed_ms);
        println!("=======================================\n");
    }

    /// Save the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    /// Fails if the file cannot be created or written to.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let formatted = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        file.write_all(formatted.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_snapshot_fields() {
        let m = ExecutionMetrics::new(ExecMode::Parallel { workers: 4 }, 4, 10, Duration::from_millis(2));
        let v = m.to_json();
        assert_eq!(v["mode"], "parallel");
        assert_eq!(v["workers"], 4);
        assert_eq!(v["elements"], 10);
    }
}
