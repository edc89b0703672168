//! Process-wide in-memory index of topics and partitions, built once at
//! startup from the `__cluster_metadata` partition.

pub mod record_batch;

use std::collections::HashMap;
use std::path::Path;

use uuid::Uuid;

use crate::codec::ByteDecoder;
use crate::error::DecodeResult;
use crate::log_segment::SegmentReader;
use record_batch::MetadataRecordValue;

/// Immutable after construction; safe for concurrent reads without
/// synchronization (spec §5).
#[derive(Debug, Default)]
pub struct ClusterMetadata {
    name_to_id: HashMap<String, Uuid>,
    id_to_name: HashMap<Uuid, String>,
    id_to_partitions: HashMap<Uuid, Vec<i32>>,
}

impl ClusterMetadata {
    /// Scans `<log_dir>/__cluster_metadata-0/00000000000000000000.log`.
    /// A missing file yields an empty index (no topics known), per
    /// spec §4.2/§4.4. Any other I/O or decode failure during this
    /// startup scan is fatal and propagated to the caller.
    pub fn load(log_dir: &Path) -> DecodeResult<Self> {
        let mut metadata = Self::default();

        let reader = SegmentReader::open(log_dir, "__cluster_metadata", 0)?;
        for batch in reader {
            let batch = batch?;
            for record in batch.records {
                let value = MetadataRecordValue::decode(&mut ByteDecoder::new(record.value))?;
                match value {
                    MetadataRecordValue::Topic(topic) => {
                        metadata.name_to_id.insert(topic.name.clone(), topic.topic_id);
                        metadata.id_to_name.insert(topic.topic_id, topic.name);
                    }
                    MetadataRecordValue::Partition(partition) => {
                        metadata
                            .id_to_partitions
                            .entry(partition.topic_id)
                            .or_default()
                            .push(partition.partition_id);
                    }
                    MetadataRecordValue::FeatureLevel(_) => {}
                    MetadataRecordValue::Unknown { .. } => {}
                }
            }
        }

        Ok(metadata)
    }

    pub fn topic_id(&self, name: &str) -> Option<Uuid> {
        self.name_to_id.get(name).copied()
    }

    #[allow(dead_code)]
    pub fn topic_name(&self, id: Uuid) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    pub fn topic_name_owned(&self, id: Uuid) -> Option<String> {
        self.id_to_name.get(&id).cloned()
    }

    /// Partition ids in encounter order from the metadata log; empty
    /// (not an error) if the topic has no recorded partitions.
    pub fn topic_partitions(&self, id: Uuid) -> &[i32] {
        self.id_to_partitions.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}
