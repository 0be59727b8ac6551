//! File-per-bucket store backend
//!
//! Events land in append-only segment files, one per time bucket of fixed
//! width (default 60 s), named by the bucket's lower bound in decimal.
//! There is no index file: the in-memory bucket index is rebuilt from the
//! directory listing at startup, ignoring names that do not parse as
//! integers.
//!
//! # Durability
//!
//! Every append is flushed to the OS immediately; `fsync` runs after every
//! 64 appends, at least every half bucket while appends are pending, on
//! bucket rotation, and on close. A failed append drops the open writer so
//! the next save reopens the segment and truncates the partial record.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use theia_filter::{Filter, FilterSpec};
use theia_protocol::frame::{self, RecordScanner};
use theia_protocol::{serialize_to_string, Event};

use crate::segment::{read_segment, SegmentWriter};
use crate::{EventStore, Result, SearchStream};

/// Width of a time bucket in seconds
pub const DEFAULT_BUCKET_WIDTH: i64 = 60;

/// Fsync after this many appends
const SYNC_EVERY_EVENTS: usize = 64;

/// ... and at least this often while appends are pending (half a bucket)
const SYNC_MAX_AGE: Duration = Duration::from_secs(30);

/// Search result channel depth
const SEARCH_BUFFER: usize = 64;

/// Metadata for one segment, kept in the in-memory index
#[derive(Debug, Clone)]
struct SegmentMeta {
    path: PathBuf,
    /// Fully framed bytes; search scans snapshot up to this length
    size: u64,
    /// Last observed write
    #[allow(dead_code)]
    last_write: SystemTime,
}

struct ActiveSegment {
    bucket: i64,
    writer: SegmentWriter,
}

/// The file-per-bucket event store.
pub struct FileStore {
    root: PathBuf,
    bucket_width: i64,
    index: RwLock<BTreeMap<i64, SegmentMeta>>,
    active: Mutex<Option<ActiveSegment>>,
}

impl FileStore {
    /// Open a store rooted at `root` with the default bucket width.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_width(root, DEFAULT_BUCKET_WIDTH)
    }

    /// Open a store with a custom bucket width in seconds.
    pub fn open_with_width(root: impl AsRef<Path>, bucket_width: i64) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;

        let index = rebuild_index(&root)?;
        info!(
            root = %root.display(),
            buckets = index.len(),
            "file store opened"
        );

        Ok(Self {
            root,
            bucket_width,
            index: RwLock::new(index),
            active: Mutex::new(None),
        })
    }

    /// The bucket an event second belongs to
    #[inline]
    fn bucket_of(&self, second: i64) -> i64 {
        second.div_euclid(self.bucket_width) * self.bucket_width
    }

    fn save_sync(&self, event: &Event) -> Result<()> {
        let bucket = self.bucket_of(event.second());
        let record = serialize_to_string(event);
        let mut framed = Vec::with_capacity(record.len() + 24);
        frame::write_record(&mut framed, record.as_bytes());

        let mut slot = self.active.lock();
        let mut seg = match slot.take() {
            Some(seg) if seg.bucket == bucket => seg,
            stale => {
                if let Some(mut old) = stale {
                    old.writer.sync()?;
                }
                let path = self.root.join(bucket.to_string());
                let writer = SegmentWriter::open(&path)?;
                self.index.write().insert(
                    bucket,
                    SegmentMeta {
                        path,
                        size: writer.size(),
                        last_write: SystemTime::now(),
                    },
                );
                debug!(bucket, "opened segment");
                ActiveSegment { bucket, writer }
            }
        };

        let appended = seg
            .writer
            .append(&framed)
            .and_then(|_| seg.writer.maybe_sync(SYNC_EVERY_EVENTS, SYNC_MAX_AGE));
        match appended {
            Ok(()) => {
                let size = seg.writer.size();
                *slot = Some(seg);
                drop(slot);
                if let Some(meta) = self.index.write().get_mut(&bucket) {
                    meta.size = size;
                    meta.last_write = SystemTime::now();
                }
                Ok(())
            }
            Err(e) => {
                // Drop the writer: the next save reopens the segment and
                // truncates whatever the failed append left behind.
                Err(e.into())
            }
        }
    }

    /// Segments whose bucket interval intersects the filter window,
    /// ascending, each with a length snapshot.
    fn plan(&self, filter: &Filter) -> Vec<(i64, PathBuf, u64)> {
        let index = self.index.read();
        index
            .iter()
            .filter(|(&bucket, _)| {
                if let Some(end) = filter.end() {
                    if bucket > end {
                        return false;
                    }
                }
                if let Some(start) = filter.start() {
                    if bucket + self.bucket_width <= start {
                        return false;
                    }
                }
                true
            })
            .map(|(&bucket, meta)| (bucket, meta.path.clone(), meta.size))
            .collect()
    }

    fn close_sync(&self) -> Result<()> {
        if let Some(mut seg) = self.active.lock().take() {
            seg.writer.sync()?;
            debug!(bucket = seg.bucket, "segment closed");
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for FileStore {
    async fn save(&self, event: &Event) -> Result<()> {
        // Appends are small and the buffered writer absorbs them; the
        // periodic fsync is the only call that can stall noticeably.
        self.save_sync(event)
    }

    async fn search(&self, spec: &FilterSpec) -> Result<SearchStream> {
        let filter = Filter::compile(spec)?;
        let desc = filter.order().is_desc();
        let mut plan = self.plan(&filter);
        if desc {
            plan.reverse();
        }

        let (tx, rx) = mpsc::channel(SEARCH_BUFFER);
        tokio::task::spawn_blocking(move || scan_plan(plan, filter, desc, tx));
        Ok(rx)
    }

    async fn close(&self) -> Result<()> {
        self.close_sync()
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if let Err(e) = self.close_sync() {
            warn!(error = %e, "flush on drop failed");
        }
    }
}

/// List the data directory and stat every segment. Non-integer names are
/// ignored.
fn rebuild_index(root: &Path) -> std::io::Result<BTreeMap<i64, SegmentMeta>> {
    let mut index = BTreeMap::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(bucket) = name.to_str().and_then(|n| n.parse::<i64>().ok()) else {
            debug!(name = ?name, "ignoring non-segment file");
            continue;
        };
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        index.insert(
            bucket,
            SegmentMeta {
                path: entry.path(),
                size: meta.len(),
                last_write: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            },
        );
    }
    Ok(index)
}

/// Scan the planned segments in order, sending matches until done or the
/// receiver goes away. Runs on the blocking pool.
fn scan_plan(
    plan: Vec<(i64, PathBuf, u64)>,
    filter: Filter,
    desc: bool,
    tx: mpsc::Sender<Result<Event>>,
) {
    for (bucket, path, snapshot) in plan {
        // Cancellation check at every bucket boundary.
        if tx.is_closed() {
            return;
        }

        let data = match read_segment(&path, snapshot) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                let _ = tx.blocking_send(Err(e.into()));
                return;
            }
        };

        // Within a bucket, append order is ascending; descending scans
        // buffer the bucket's matches and emit them reversed.
        let mut buffered = Vec::new();
        for record in RecordScanner::new(&data) {
            match theia_protocol::parse(record) {
                Ok(event) => {
                    if !filter.matches(&event) {
                        continue;
                    }
                    if desc {
                        buffered.push(event);
                    } else if tx.blocking_send(Ok(event)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!(bucket, error = %e, "skipping unreadable record");
                }
            }
        }
        for event in buffered.into_iter().rev() {
            if tx.blocking_send(Ok(event)).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "file_test.rs"]
mod tests;
