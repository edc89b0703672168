//! Reader over the RecordBatches stored in a partition's first segment
//! file: `{log_dir}/{topic}-{partition}/00000000000000000000.log`.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::codec::ByteDecoder;
use crate::error::DecodeResult;
use crate::metadata::record_batch::RecordBatch;

const SEGMENT_FILE_NAME: &str = "00000000000000000000.log";

pub struct SegmentReader {
    decoder: ByteDecoder,
}

impl SegmentReader {
    /// A missing segment file yields an empty reader — `Fetch` treats
    /// a known topic with no on-disk log as having empty records, and
    /// the metadata scan treats a missing `__cluster_metadata` segment
    /// as an empty index. Any other I/O error is returned to the
    /// caller, which decides whether that's fatal (metadata startup
    /// scan) or degrades to empty records (a Fetch partition read).
    pub fn open(log_dir: &Path, topic: &str, partition: i32) -> DecodeResult<Self> {
        let path = segment_path(log_dir, topic, partition);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Bytes::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            decoder: ByteDecoder::new(bytes),
        })
    }

    /// Same as `open`, but any I/O error (including a missing file)
    /// degrades to an empty reader. Used by `Fetch`, where a topic is
    /// known but its log happens to be unreadable (spec §7).
    pub fn open_or_empty(log_dir: &Path, topic: &str, partition: i32) -> Self {
        match Self::open(log_dir, topic, partition) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::warn!(topic, partition, error = %e, "failed to read log segment, treating as empty");
                Self {
                    decoder: ByteDecoder::new(Bytes::new()),
                }
            }
        }
    }
}

pub fn segment_path(log_dir: &Path, topic: &str, partition: i32) -> PathBuf {
    log_dir
        .join(format!("{topic}-{partition}"))
        .join(SEGMENT_FILE_NAME)
}

impl Iterator for SegmentReader {
    type Item = DecodeResult<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.decoder.is_empty() {
            return None;
        }
        Some(RecordBatch::decode(&mut self.decoder))
    }
}
