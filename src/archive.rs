//! Raw line archive
//!
//! Every raw line is archived before it is decoded, whatever the outcome, so
//! corrupted traffic stays available for post-flight analysis. Each feed owns
//! its own archive; nothing here is shared between tasks.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

use crate::error::{RelayError, Result};
use crate::types::{FeedId, RawLine};

/// Sink for raw input lines.
#[async_trait::async_trait]
pub trait RawArchive: Send + 'static {
    /// Append one line.
    async fn append(&mut self, line: &RawLine) -> Result<()>;

    /// Flush buffered output.
    async fn flush(&mut self) -> Result<()>;
}

/// Append-only per-feed log file: one `<unix-millis>\t<line>` record per line.
pub struct FileArchive {
    feed: FeedId,
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileArchive {
    /// Open (or create) `<dir>/<feed>.log` for appending.
    pub async fn open(dir: impl AsRef<Path>, feed: &FeedId) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| RelayError::io_error(dir.to_path_buf(), e))?;

        let path = dir.join(format!("{}.log", file_stem(feed.as_str())));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| RelayError::io_error(path.clone(), e))?;

        info!(%feed, path = %path.display(), "Archiving raw lines");
        Ok(Self { feed: feed.clone(), path, writer: BufWriter::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl RawArchive for FileArchive {
    async fn append(&mut self, line: &RawLine) -> Result<()> {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis());
        let prefix = format!("{}\t", millis);
        let result = async {
            self.writer.write_all(prefix.as_bytes()).await?;
            self.writer.write_all(&line.bytes).await?;
            self.writer.write_all(b"\n").await?;
            self.writer.flush().await
        }
        .await;
        result.map_err(|e| RelayError::archive_error(self.feed.as_str(), e))
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await.map_err(|e| RelayError::archive_error(self.feed.as_str(), e))
    }
}

/// Feed ids become file names; keep them to a portable character set.
fn file_stem(feed: &str) -> String {
    let stem: String = feed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if stem.trim_matches('.').is_empty() { "feed".to_string() } else { stem }
}
