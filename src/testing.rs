//! Testing utilities for semflow pipelines.
//!
//! - **Assertions**: compare pipeline outputs with expected results, and check
//!   that a terminal gives the same answer sequentially and in parallel
//!   ([`assert_parallel_eq`]).
//! - **[`CountingSource`]**: a range source that counts how many elements it
//!   produced, for asserting laziness and early termination.
//! - **[`temp_text_file`]**: a temporary file holding given text, for
//!   reader-backed sources.
//!
//! # Quick Start
//!
//! ```no_run
//! use semflow::*;
//! use semflow::testing::*;
//!
//! #[test]
//! fn limit_stops_the_source() -> anyhow::Result<()> {
//!     let source = CountingSource::new(1_000);
//!     let out = source.semantic().limit(3).to_vec()?;
//!     assert_collections_equal(&out, &[0, 1, 2]);
//!     assert_eq!(source.produced(), 3);
//!     Ok(())
//! }
//! ```

pub mod assertions;

pub use assertions::*;

use crate::generator::Timestamp;
use crate::semantic::Semantic;
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;

/// The range `0..len` whose pipeline records every element it hands out.
///
/// Elements rejected by the interrupt are not counted, so after a run
/// `produced()` is the number of elements the source actually emitted.
#[derive(Clone, Debug)]
pub struct CountingSource {
    len: usize,
    produced: Arc<AtomicUsize>,
}

impl CountingSource {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            len,
            produced: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A pipeline over the range; every run adds to the shared counter.
    #[must_use]
    pub fn semantic(&self) -> Semantic<usize> {
        let (len, produced) = (self.len, Arc::clone(&self.produced));
        Semantic::from_generator(
            move |accept: &mut dyn FnMut(usize, Timestamp), interrupt: &mut dyn FnMut(&usize) -> bool| -> Result<()> {
                for i in 0..len {
                    if interrupt(&i) {
                        break;
                    }
                    produced.fetch_add(1, Ordering::SeqCst);
                    accept(i, i as Timestamp);
                }
                Ok(())
            },
        )
    }

    #[must_use]
    pub fn produced(&self) -> usize {
        self.produced.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.produced.store(0, Ordering::SeqCst);
    }
}

/// A temporary file containing `contents`, deleted on drop.
///
/// # Errors
/// Fails if the file cannot be created or written.
pub fn temp_text_file(contents: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new().context("creating temp file")?;
    file.write_all(contents.as_bytes()).context("writing temp file")?;
    file.flush()?;
    Ok(file)
}
