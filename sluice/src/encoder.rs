//! Pull-based stream encoder over a batch of metrics.
//!
//! [`StreamEncoder`] turns an ordered batch of [`Metric`]s into a byte stream
//! that the caller drains in chunks of whatever size it likes. Whole metrics
//! are copied straight into the caller's buffer while they fit; a metric that
//! does not fit is serialized once into a scratch buffer and handed out over
//! as many calls as it takes.
//!
//! # States
//!
//! - `Normal` copies whole metrics until the next one does not fit.
//! - `Split` drains the scratch buffer of a metric that did not fit.
//! - `Done` returns `(0, end_of_stream)` forever.
//!
//! A metric is copied directly only when its length is strictly less than the
//! remaining capacity. A metric that exactly fills the remaining capacity goes
//! through the split path instead: it is delivered whole, and the following
//! pull returns zero bytes while the encoder moves on to the next metric (or
//! reports end-of-stream if it was the last one).
//!
//! # Example
//!
//! ```rust
//! use sluice::encoder::StreamEncoder;
//! use sluice::metric::{FieldValue, LineMetric};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let no_tags: &[(&str, &str)] = &[];
//! let m = LineMetric::new("foo", no_tags, &[("value", FieldValue::Int(10))], 1_481_032_190_000_000_000)?;
//! let mut encoder = StreamEncoder::new(vec![m]);
//!
//! let mut buf = [0u8; 16];
//! let mut out = Vec::new();
//! loop {
//!     let pull = encoder.pull(&mut buf);
//!     out.extend_from_slice(&buf[..pull.written]);
//!     if pull.end_of_stream {
//!         break;
//!     }
//! }
//! assert_eq!(out, b"foo value=10i 1481032190000000000\n");
//! # Ok(())
//! # }
//! ```

use std::io;

use crate::metric::Metric;

/// Result of a single [`StreamEncoder::pull`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pull {
    /// Number of bytes written to the start of the buffer.
    pub written: usize,
    /// Set on the call that delivers the final byte, and on every call after.
    pub end_of_stream: bool,
}

impl Pull {
    const fn more(written: usize) -> Self {
        Self {
            written,
            end_of_stream: false,
        }
    }

    const fn end(written: usize) -> Self {
        Self {
            written,
            end_of_stream: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Split,
    Done,
}

/// Streams an owned batch of metrics into caller-supplied buffers.
///
/// Not meant to be shared: a single encoder carries a cursor and must be
/// driven by one caller at a time. Concurrent producers each own their own
/// encoder over their own batch.
#[derive(Debug)]
pub struct StreamEncoder<M> {
    metrics: Vec<M>,
    state: State,
    /// Index of the metric currently being emitted.
    metric_index: usize,
    /// Encoding of a metric being split across calls.
    scratch: Vec<u8>,
    /// Read offset into `scratch`.
    scratch_offset: usize,
    emitted: u64,
}

impl<M: Metric> StreamEncoder<M> {
    /// Creates an encoder positioned at the start of `metrics`.
    ///
    /// An empty batch is valid; the first pull reports end-of-stream.
    pub fn new(metrics: Vec<M>) -> Self {
        Self {
            metrics,
            state: State::Normal,
            metric_index: 0,
            scratch: Vec::new(),
            scratch_offset: 0,
            emitted: 0,
        }
    }

    /// Total number of bytes this encoder will emit over its lifetime.
    ///
    /// This is the size to declare when streaming the encoder as an HTTP body.
    pub fn encoded_len(&self) -> u64 {
        self.metrics.iter().map(|m| m.encoded_len() as u64).sum()
    }

    /// Number of bytes emitted so far.
    pub fn bytes_emitted(&self) -> u64 {
        self.emitted
    }

    /// Returns `true` once the final byte has been emitted.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Fills `buf` with the next bytes of the stream.
    ///
    /// Returns how many bytes were written and whether the stream has ended.
    /// The call that writes the last byte reports end-of-stream, unless the
    /// last metric exactly filled the buffer on the split path, in which case
    /// the next call reports it with zero bytes. Once reported, every later
    /// call returns zero bytes with end-of-stream set.
    pub fn pull(&mut self, buf: &mut [u8]) -> Pull {
        let pull = match self.state {
            State::Done => return Pull::end(0),
            State::Normal => self.pull_normal(buf),
            State::Split => self.pull_split(buf),
        };
        self.emitted += pull.written as u64;
        pull
    }

    fn pull_normal(&mut self, buf: &mut [u8]) -> Pull {
        if self.metric_index >= self.metrics.len() {
            self.state = State::Done;
            return Pull::end(0);
        }

        let mut written = 0;
        loop {
            let metric = &self.metrics[self.metric_index];
            let len = metric.encoded_len();
            if len >= buf.len() - written {
                break;
            }
            written += metric.copy_to(&mut buf[written..]);
            self.metric_index += 1;
            if self.metric_index == self.metrics.len() {
                self.finish();
                return Pull::end(written);
            }
        }

        if written > 0 {
            return Pull::more(written);
        }

        // Nothing fit: hand the current metric out piecewise. Exhaustion of
        // the scratch buffer is only noticed by the next pull, even when this
        // first slice already covers the whole metric.
        self.scratch = self.metrics[self.metric_index].serialize();
        let n = self.scratch.len().min(buf.len());
        buf[..n].copy_from_slice(&self.scratch[..n]);
        self.scratch_offset = n;
        self.state = State::Split;
        tracing::trace!(
            metric_index = self.metric_index,
            metric_len = self.scratch.len(),
            buf_len = buf.len(),
            "splitting metric across reads"
        );
        Pull::more(n)
    }

    fn pull_split(&mut self, buf: &mut [u8]) -> Pull {
        let remaining = &self.scratch[self.scratch_offset..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.scratch_offset += n;

        if self.scratch_offset < self.scratch.len() {
            return Pull::more(n);
        }

        self.scratch_offset = 0;
        self.scratch.clear();
        self.metric_index += 1;
        if self.metric_index == self.metrics.len() {
            self.finish();
            return Pull::end(n);
        }
        self.state = State::Normal;
        Pull::more(n)
    }

    fn finish(&mut self) {
        self.state = State::Done;
        self.scratch = Vec::new();
        tracing::trace!(metrics = self.metrics.len(), "encoder drained");
    }
}

/// Lets an encoder be used anywhere a reader is expected, such as a streamed
/// HTTP request body.
///
/// A pull that crosses the end of a split metric can write zero bytes without
/// ending the stream. The reader skips over those, so `Ok(0)` on a non-empty
/// buffer always means the stream is finished.
impl<M: Metric> io::Read for StreamEncoder<M> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let pull = self.pull(buf);
            if pull.written > 0 || pull.end_of_stream {
                return Ok(pull.written);
            }
        }
    }
}
