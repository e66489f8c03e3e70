// This file is part of freq_cardinality. Copyright © 2026 freq_cardinality contributors.
// freq_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

//! freq_cardinality keeps approximate occurrence counts for an unbounded stream of byte-string
//! keys inside a fixed memory budget. A [`BoundedCounter`] answers three questions: the current
//! count for any key, the approximate number of distinct keys ever seen, and which keys were
//! frequent enough to survive eviction.
//!
//! The table never grows. When it fills past three quarters, the least-frequent entries are
//! evicted in place, and a HyperLogLog sketch keeps the distinct-key estimate honest even after
//! exact membership information is gone. Keys are compared by byte value alone and must not
//! contain NUL bytes.
//!
//! Note freq_cardinality only supports newline (`\n`) delimited input in its line-counting
//! helpers and does not perform any UTF-8 validation.

use std::io::BufRead;

use bstr::io::BufReadExt;
use cfg_if::cfg_if;

pub use bounded_counter_impl::counter::{
    BoundedCounter, BoundedCounterItems, BoundedCounterKeys, CountBin,
};
#[cfg(all(feature = "file", feature = "memmap"))]
pub use bounded_counter_impl::file_io::CountLinesFromMemmapFile;
#[cfg(feature = "file")]
pub use bounded_counter_impl::file_io::CountLinesFromReadFile;
pub use bounded_counter_impl::result::Cause as ErrorCause;
pub use bounded_counter_impl::result::Error;
pub use bounded_counter_impl::result::Result;

pub(crate) mod bounded_counter_impl;

/// Functionality to feed newline-delimited input into a counter.
///
/// A typical example:
///
/// ```rust
/// use freq_cardinality::{BoundedCounter, CountLines};
///
/// // grab some test data
/// let data = b"three\ntwo\nthree\ntwo\nthree\none";
/// let mut reader = data.as_slice();
///
/// // count line occurrences
/// let mut counter = BoundedCounter::new(1024).unwrap();
/// counter.count_lines_in_read(&mut reader).unwrap();
///
/// assert_eq!(counter.get(b"three"), 3);
/// assert_eq!(counter.get(b"one"), 1);
///
/// // 3 distinct lines were seen
/// assert_eq!(counter.cardinality(), 3);
/// ```
pub trait CountLines: Sized {
    /// Count a single line, incrementing its entry by one.
    fn count_line(&mut self, line: &[u8]) -> Result;

    /// Count lines in a newline-delimited [`BufRead`].
    ///
    /// Note that this can also be used to read [`Stdin`](std::io::Stdin):
    ///
    /// ```rust
    /// use freq_cardinality::{BoundedCounter, CountLines};
    ///
    /// let mut reader = std::io::stdin().lock();
    ///
    /// let mut counter = BoundedCounter::new(1024).unwrap();
    /// counter.count_lines_in_read(&mut reader).unwrap();
    ///
    /// // we didn't send anything over stdin
    /// assert_eq!(counter.total(), 0);
    /// ```
    fn count_lines_in_read<T: BufRead>(&mut self, mut reader: T) -> Result {
        let mut failure = None;
        reader
            .for_byte_line(|line| match self.count_line(line) {
                Ok(()) => Ok(true),
                Err(e) => {
                    failure = Some(e);
                    Ok(false)
                }
            })
            .map_err(|e| Error::io_static("failed to read from buffer", e))?;
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Count lines in newline-delimited bytes.
    fn count_lines_in_bytes(&mut self, bytes: &[u8]) -> Result {
        cfg_if! {
            if #[cfg(feature = "memchr")] {
                let mut start: usize = 0;
                for newline_index in memchr::memchr_iter(b'\n', bytes) {
                    self.count_line(&bytes[start..newline_index])?;
                    start = newline_index + 1;
                }
                // handle trailing
                if start < bytes.len() {
                    self.count_line(&bytes[start..])?;
                }
                Ok(())
            } else {
                self.count_lines_in_read(bytes)
            }
        }
    }
}
