//! Line source over any async buffered reader

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{debug, info, trace};

use crate::error::{RelayError, Result};
use crate::provider::LineSource;
use crate::types::{FeedId, RawLine};

/// Longest line kept whole. Longer runs without a newline are split.
pub const MAX_LINE_BYTES: u64 = 4096;

/// Reads newline-terminated lines from a byte stream.
///
/// Works for a serial device node opened as a file, a capture file, a pipe,
/// or an in-memory buffer. Bytes are passed through untouched apart from the
/// `\n` / `\r\n` terminator; invalid UTF-8 is left for the decoder to deal
/// with. Empty lines are skipped.
pub struct ReaderSource<R> {
    feed: FeedId,
    reader: R,
    seq: u64,
    buf: Vec<u8>,
}

impl ReaderSource<BufReader<File>> {
    /// Open a device or file path for reading.
    pub async fn open(path: impl AsRef<Path>, feed: FeedId) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).await.map_err(|e| RelayError::io_error(path.to_path_buf(), e))?;
        info!(%feed, path = %path.display(), "Opened line source");
        Ok(Self::new(feed, BufReader::new(file)))
    }
}

impl<R> ReaderSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(feed: FeedId, reader: R) -> Self {
        Self { feed, reader, seq: 0, buf: Vec::with_capacity(256) }
    }

    /// Lines yielded so far.
    pub fn lines_read(&self) -> u64 {
        self.seq
    }

    /// Read the next non-empty line's bytes, terminator removed.
    pub(crate) async fn read_raw(&mut self) -> Result<Option<&[u8]>> {
        loop {
            self.buf.clear();
            let n = (&mut self.reader)
                .take(MAX_LINE_BYTES)
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(|e| RelayError::source_error(self.feed.as_str(), "read failed", e))?;
            if n == 0 {
                debug!(feed = %self.feed, lines = self.seq, "Line source reached end of input");
                return Ok(None);
            }

            let mut line = self.buf.as_slice();
            if let Some(stripped) = line.strip_suffix(b"\n") {
                line = stripped;
            }
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            if line.is_empty() {
                continue;
            }

            let len = line.len();
            return Ok(Some(&self.buf[..len]));
        }
    }

    pub(crate) fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }
}

#[async_trait::async_trait]
impl<R> LineSource for ReaderSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn next_line(&mut self) -> Result<Option<RawLine>> {
        let bytes = match self.read_raw().await? {
            Some(bytes) => bytes.to_vec(),
            None => return Ok(None),
        };
        let seq = self.next_seq();
        trace!(feed = %self.feed, seq, len = bytes.len(), "Read line");
        Ok(Some(RawLine::new(self.feed.clone(), seq, bytes)))
    }

    fn feed(&self) -> &FeedId {
        &self.feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source(input: &'static [u8]) -> ReaderSource<&'static [u8]> {
        ReaderSource::new(FeedId::from("test"), input)
    }

    async fn collect<S: LineSource>(mut source: S) -> Vec<RawLine> {
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn splits_and_trims_terminators() {
        let lines = collect(source(b"R:1:2:3\r\nT:4:5\n\n\r\nlast")).await;
        let texts: Vec<_> = lines.iter().map(|l| l.text().into_owned()).collect();
        assert_eq!(texts, vec!["R:1:2:3", "T:4:5", "last"]);
        let seqs: Vec<_> = lines.iter().map(|l| l.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn invalid_utf8_is_preserved() {
        let lines = collect(source(b"\xff\xfeR:1\n")).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(&*lines[0].bytes, b"\xff\xfeR:1");
    }

    #[tokio::test]
    async fn overlong_runs_are_split() {
        let long: &'static [u8] = Box::leak(vec![b'x'; 5000].into_boxed_slice());
        let lines = collect(source(long)).await;
        assert_eq!(lines.iter().map(RawLine::len).collect::<Vec<_>>(), vec![4096, 904]);
    }

    #[tokio::test]
    async fn opens_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first line").unwrap();
        writeln!(file, "second line").unwrap();

        let source = ReaderSource::open(file.path(), FeedId::from("capture")).await.unwrap();
        assert_eq!(source.feed().as_str(), "capture");
        let lines = collect(source).await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text(), "second line");
    }

    #[tokio::test]
    async fn missing_path_is_an_io_error() {
        let result = ReaderSource::open("/nonexistent/downlink/feed", FeedId::from("gone")).await;
        assert!(matches!(result, Err(RelayError::Io { .. })));
    }
}
