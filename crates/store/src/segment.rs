//! Segment file access
//!
//! A segment is the append-only file of one time bucket, holding framed
//! records (see `theia_protocol::frame`). The writer validates the tail on
//! open and truncates back to the last fully framed record, so a crash
//! mid-append can never corrupt later writes. Readers take a length
//! snapshot and scan only bytes that existed when the scan started.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::warn;

use theia_protocol::frame::RecordScanner;

/// An open segment positioned for appends.
pub struct SegmentWriter {
    path: PathBuf,
    file: BufWriter<File>,
    /// Bytes of fully framed records currently in the file
    size: u64,
    /// Appends since the last fsync
    unsynced: usize,
    last_sync: Instant,
}

impl SegmentWriter {
    /// Open (or create) a segment for appending.
    ///
    /// Any half-written tail left by a crash is truncated away before the
    /// file is positioned for appends.
    pub fn open(path: &Path) -> io::Result<Self> {
        let valid = recover_tail(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: BufWriter::new(file),
            size: valid,
            unsynced: 0,
            last_sync: Instant::now(),
        })
    }

    /// Segment path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size in fully framed bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Append one already-framed record and flush it to the OS.
    pub fn append(&mut self, framed: &[u8]) -> io::Result<()> {
        self.file.write_all(framed)?;
        self.file.flush()?;
        self.size += framed.len() as u64;
        self.unsynced += 1;
        Ok(())
    }

    /// Fsync if the backlog exceeds `max_events` appends or `max_age`.
    pub fn maybe_sync(&mut self, max_events: usize, max_age: Duration) -> io::Result<()> {
        if self.unsynced >= max_events || (self.unsynced > 0 && self.last_sync.elapsed() >= max_age)
        {
            self.sync()?;
        }
        Ok(())
    }

    /// Flush and fsync unconditionally.
    pub fn sync(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.get_ref().sync_data()?;
        self.unsynced = 0;
        self.last_sync = Instant::now();
        Ok(())
    }
}

/// Validate the tail of a segment, truncating a partial record.
///
/// Returns the validated length. A missing file is an empty segment.
fn recover_tail(path: &Path) -> io::Result<u64> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut scanner = RecordScanner::new(&data);
    while scanner.next_record().is_some() {}
    let valid = scanner.valid_len();

    if valid < data.len() {
        warn!(
            path = %path.display(),
            dropped = data.len() - valid,
            "truncating half-written segment tail"
        );
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(valid as u64)?;
        file.sync_data()?;
    }
    Ok(valid as u64)
}

/// Read at most `limit` bytes of a segment (the scan-start snapshot).
pub fn read_segment(path: &Path, limit: u64) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut data = Vec::with_capacity(limit as usize);
    file.take(limit).read_to_end(&mut data)?;
    Ok(data)
}

#[cfg(test)]
#[path = "segment_test.rs"]
mod tests;
