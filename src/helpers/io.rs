//! Character-stream sources over any [`Read`] + [`Send`] reader.
//!
//! ### Overview
//! - [`from_bytes`] -- one `u8` per element.
//! - [`from_chunks`] -- fixed-size `Vec<u8>` blocks; the last may be shorter.
//! - [`from_lines`] -- `String` per line, line terminators (`\n`, `\r\n`) stripped.
//! - [`from_split`] -- `String` per `delimiter`-separated field.
//! - [`from_text`] -- the whole stream as a single `String`.
//!
//! The reader is consumed lazily, when a terminal runs, and at most once:
//! records already read are kept and replayed, so running the pipeline again
//! (or from several partitions of a parallel terminal) sees the same
//! elements. An interrupted run leaves the rest of the stream unread for the
//! next one. Read errors and invalid UTF-8 abort the traversal and surface
//! from the terminal call.
//!
//! ### Example
//! ```ignore
//! use semflow::*;
//! use std::io::Cursor;
//!
//! let lines = from_lines(Cursor::new("a\nbb\nccc\n"));
//! assert_eq!(lines.map(|l| l.len()).to_vec()?, vec![1, 2, 3]);
//! ```

use crate::generator::{Generator, Timestamp};
use crate::semantic::Semantic;
use anyhow::{Context, Result, ensure};
use std::io::{BufRead, BufReader, Read};
use std::sync::{Mutex, PoisonError};

#[derive(Clone, Copy, Debug)]
enum Framing {
    Bytes,
    Chunks(usize),
    Split(u8),
    Lines,
    Text,
}

/// Reader plus every record taken from it so far.
struct ReaderState<R> {
    input: BufReader<R>,
    seen: Vec<Vec<u8>>,
    exhausted: bool,
}

struct ReaderSource<R> {
    state: Mutex<ReaderState<R>>,
    framing: Framing,
}

impl<R: Read + Send> ReaderSource<R> {
    fn new(reader: R, framing: Framing) -> Self {
        Self {
            state: Mutex::new(ReaderState {
                input: BufReader::new(reader),
                seen: Vec::new(),
                exhausted: false,
            }),
            framing,
        }
    }

    /// Feed framed records to `emit` until it returns `false` or EOF.
    ///
    /// Records read by earlier runs are replayed first; the reader is only
    /// touched for records no run has seen yet. The lock is held only while
    /// a record is fetched, never during `emit`, so downstream stages may
    /// run this source again.
    fn drive(&self, emit: &mut dyn FnMut(Vec<u8>) -> bool) -> Result<()> {
        for index in 0.. {
            let Some(record) = self.record_at(index)? else {
                break;
            };
            if !emit(record) {
                break;
            }
        }
        Ok(())
    }

    /// The `index`-th record of the stream, reading ahead if needed.
    fn record_at(&self, index: usize) -> Result<Option<Vec<u8>>> {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = st.seen.get(index) {
            return Ok(Some(record.clone()));
        }
        if st.exhausted {
            return Ok(None);
        }
        let Some(record) = next_record(&mut st.input, self.framing)? else {
            st.exhausted = true;
            return Ok(None);
        };
        st.seen.push(record.clone());
        Ok(Some(record))
    }
}

/// The next framed record, `None` at end of stream.
fn next_record<B: BufRead>(input: &mut B, framing: Framing) -> Result<Option<Vec<u8>>> {
    let record = match framing {
        Framing::Bytes => {
            let mut buf = [0u8; 1];
            if input.read(&mut buf).context("reading byte stream")? == 0 {
                return Ok(None);
            }
            vec![buf[0]]
        }
        Framing::Chunks(size) => {
            ensure!(size > 0, "chunk size must be positive");
            let mut chunk = Vec::with_capacity(size);
            Read::take(&mut *input, size as u64)
                .read_to_end(&mut chunk)
                .context("reading chunk")?;
            if chunk.is_empty() {
                return Ok(None);
            }
            chunk
        }
        Framing::Split(delimiter) => {
            let mut field = Vec::new();
            if input.read_until(delimiter, &mut field).context("reading field")? == 0 {
                return Ok(None);
            }
            if field.last() == Some(&delimiter) {
                field.pop();
            }
            field
        }
        Framing::Lines => {
            let mut line = Vec::new();
            if input.read_until(b'\n', &mut line).context("reading line")? == 0 {
                return Ok(None);
            }
            if line.last() == Some(&b'\n') {
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
            }
            line
        }
        Framing::Text => {
            let mut all = Vec::new();
            input.read_to_end(&mut all).context("reading text")?;
            if all.is_empty() {
                return Ok(None);
            }
            all
        }
    };
    Ok(Some(record))
}

/// Drives a [`ReaderSource`], decoding each record with `decode`.
struct Decoded<R, F> {
    source: ReaderSource<R>,
    decode: F,
}

impl<R, T, F> Generator<T> for Decoded<R, F>
where
    R: Read + Send,
    F: Fn(Vec<u8>) -> Result<T> + Send + Sync,
{
    fn generate(
        &self,
        accept: &mut dyn FnMut(T, Timestamp),
        interrupt: &mut dyn FnMut(&T) -> bool,
    ) -> Result<()> {
        let mut ts: Timestamp = 0;
        let mut failure = None;
        self.source.drive(&mut |record| match (self.decode)(record) {
            Ok(value) => {
                if interrupt(&value) {
                    return false;
                }
                accept(value, ts);
                ts += 1;
                true
            }
            Err(e) => {
                failure = Some(e);
                false
            }
        })?;
        failure.map_or(Ok(()), Err)
    }
}

fn utf8(record: Vec<u8>) -> Result<String> {
    String::from_utf8(record).context("stream is not valid UTF-8")
}

fn stream<R, T, F>(reader: R, framing: Framing, decode: F) -> Semantic<T>
where
    R: Read + Send + 'static,
    T: crate::Element,
    F: Fn(Vec<u8>) -> Result<T> + Send + Sync + 'static,
{
    Semantic::from_generator(Decoded {
        source: ReaderSource::new(reader, framing),
        decode,
    })
}

/// One element per byte.
pub fn from_bytes<R: Read + Send + 'static>(reader: R) -> Semantic<u8> {
    stream(reader, Framing::Bytes, |mut b: Vec<u8>| {
        b.pop().context("empty byte record")
    })
}

/// Blocks of `size` bytes. A zero `size` fails at terminal time.
pub fn from_chunks<R: Read + Send + 'static>(reader: R, size: usize) -> Semantic<Vec<u8>> {
    stream(reader, Framing::Chunks(size), Ok)
}

pub fn from_lines<R: Read + Send + 'static>(reader: R) -> Semantic<String> {
    stream(reader, Framing::Lines, utf8)
}

/// Fields separated by `delimiter`; a trailing delimiter does not start an
/// empty field.
pub fn from_split<R: Read + Send + 'static>(reader: R, delimiter: u8) -> Semantic<String> {
    stream(reader, Framing::Split(delimiter), utf8)
}

/// The entire stream as one element (none for an empty stream).
pub fn from_text<R: Read + Send + 'static>(reader: R) -> Semantic<String> {
    stream(reader, Framing::Text, utf8)
}
