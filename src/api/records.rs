//! Record framing for the streamed response body.
//!
//! Network chunks arrive at arbitrary boundaries: a record may be split
//! across several reads, and so may a multi-byte UTF-8 character. Bytes are
//! buffered undecoded and only complete records (terminated by a blank line)
//! are decoded. The delimiter is pure ASCII, so a complete record never ends
//! in the middle of a character.

use futures::StreamExt;
use futures::stream::BoxStream;
use log::{debug, warn};

use super::ApiError;

/// Raw body chunks as delivered by the transport.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ApiError>>;

/// Splits a byte stream into blank-line delimited records.
#[derive(Debug, Default)]
pub struct RecordSplitter {
    buffer: Vec<u8>,
    /// Bytes already searched without finding a blank line.
    scanned: usize,
}

impl RecordSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes buffered but not yet emitted as a record.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Pop the next complete record, if one is buffered.
    ///
    /// Empty records (runs of blank lines) are skipped.
    pub fn next_record(&mut self) -> Option<String> {
        // A delimiter can straddle the previous end of the buffer, so back
        // up by its longest length minus one.
        while let Some((end, consumed)) =
            find_boundary(&self.buffer, self.scanned.saturating_sub(3))
        {
            self.scanned = 0;
            let raw: Vec<u8> = self.buffer.drain(..consumed).take(end).collect();
            if let Some(record) = decode(raw) {
                return Some(record);
            }
        }
        self.scanned = self.buffer.len();
        None
    }

    /// Flush whatever is left once the body has ended.
    ///
    /// A final record that was never terminated by a blank line is still
    /// emitted; whitespace-only leftovers are dropped.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        let raw = std::mem::take(&mut self.buffer);
        decode(raw)
    }
}

/// Locate the first blank line at or after `from`. Returns
/// `(record_end, bytes_to_consume)`.
///
/// Accepts `\n\n` and `\r\n\r\n` (and the mixed `\n\r\n`).
fn find_boundary(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    for (i, &b) in buf.iter().enumerate().skip(from) {
        if b != b'\n' {
            continue;
        }
        let end = if i > 0 && buf[i - 1] == b'\r' { i - 1 } else { i };
        match buf.get(i + 1..) {
            Some([b'\n', ..]) => return Some((end, i + 2)),
            Some([b'\r', b'\n', ..]) => return Some((end, i + 3)),
            _ => {}
        }
    }
    None
}

fn decode(raw: Vec<u8>) -> Option<String> {
    let text = match String::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => {
            warn!("Record contains invalid UTF-8, decoding lossily: {}", e);
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// A stream of complete records read from a response body.
pub struct RecordStream {
    bytes: ByteStream,
    splitter: RecordSplitter,
    finished: bool,
}

impl RecordStream {
    pub fn new(bytes: ByteStream) -> Self {
        Self {
            bytes,
            splitter: RecordSplitter::new(),
            finished: false,
        }
    }

    /// Build a stream from in-memory chunks. Handy for tests and replays.
    pub fn from_chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        let chunks: Vec<Result<Vec<u8>, ApiError>> =
            chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::new(futures::stream::iter(chunks).boxed())
    }

    /// Next complete record, `Ok(None)` once the body is exhausted.
    ///
    /// Cancel-safe: buffered state only changes after a chunk has been
    /// received, so dropping the future inside `select!` loses nothing.
    pub async fn next_record(&mut self) -> Result<Option<String>, ApiError> {
        loop {
            if let Some(record) = self.splitter.next_record() {
                return Ok(Some(record));
            }
            if self.finished {
                return Ok(None);
            }
            match self.bytes.next().await {
                Some(Ok(chunk)) => {
                    debug!(
                        "Body chunk: {} bytes ({} buffered)",
                        chunk.len(),
                        self.splitter.buffered()
                    );
                    self.splitter.push(&chunk);
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Err(e);
                }
                None => {
                    self.finished = true;
                    return Ok(self.splitter.finish());
                }
            }
        }
    }
}
