//! Fetch (key 1, v16).
//!
//! <https://kafka.apache.org/protocol.html#The_Messages_Fetch>

use std::path::Path;

use bytes::Bytes;
use uuid::Uuid;

use crate::codec::{ByteDecoder, ByteEncoder};
use crate::error::DecodeResult;
use crate::log_segment::SegmentReader;
use crate::metadata::ClusterMetadata;

use super::{encode_response_header, ApiKey, ErrorCode};

#[derive(Debug)]
#[allow(dead_code)]
pub struct FetchPartitionRequest {
    pub partition: i32,
    pub current_leader_epoch: i32,
    pub fetch_offset: i64,
    pub last_fetched_epoch: i32,
    pub log_start_offset: i64,
    pub partition_max_bytes: i32,
}

impl FetchPartitionRequest {
    fn decode(src: &mut ByteDecoder) -> DecodeResult<Self> {
        let partition = src.get_i32()?;
        let current_leader_epoch = src.get_i32()?;
        let fetch_offset = src.get_i64()?;
        let last_fetched_epoch = src.get_i32()?;
        let log_start_offset = src.get_i64()?;
        let partition_max_bytes = src.get_i32()?;
        src.get_tagged_fields()?;
        Ok(Self {
            partition,
            current_leader_epoch,
            fetch_offset,
            last_fetched_epoch,
            log_start_offset,
            partition_max_bytes,
        })
    }
}

#[derive(Debug)]
pub struct FetchTopicRequest {
    pub topic_id: Uuid,
    pub partitions: Vec<FetchPartitionRequest>,
}

impl FetchTopicRequest {
    fn decode(src: &mut ByteDecoder) -> DecodeResult<Self> {
        let topic_id = src.get_uuid()?;
        let partitions = src.get_compact_array(FetchPartitionRequest::decode)?;
        src.get_tagged_fields()?;
        Ok(Self {
            topic_id,
            partitions,
        })
    }
}

#[derive(Debug)]
#[allow(dead_code)]
pub struct FetchRequest {
    pub correlation_id: i32,
    pub max_wait_ms: i32,
    pub min_bytes: i32,
    pub max_bytes: i32,
    pub isolation_level: i8,
    pub session_id: i32,
    pub session_epoch: i32,
    pub topics: Vec<FetchTopicRequest>,
    pub rack_id: String,
}

impl FetchRequest {
    pub fn decode(src: &mut ByteDecoder, correlation_id: i32) -> DecodeResult<Self> {
        let max_wait_ms = src.get_i32()?;
        let min_bytes = src.get_i32()?;
        let max_bytes = src.get_i32()?;
        let isolation_level = src.get_i8()?;
        let session_id = src.get_i32()?;
        let session_epoch = src.get_i32()?;
        let topics = src.get_compact_array(FetchTopicRequest::decode)?;

        // forgotten_topics_data: {topic_id: UUID, partitions: COMPACT_ARRAY(INT32), tagged_fields}
        let _forgotten_topics = src.get_compact_array(|d| {
            let topic_id = d.get_uuid()?;
            let partitions = d.get_compact_array(|d| d.get_i32())?;
            d.get_tagged_fields()?;
            DecodeResult::Ok((topic_id, partitions))
        })?;

        let rack_id = src.get_compact_string()?;
        src.get_tagged_fields()?;

        Ok(Self {
            correlation_id,
            max_wait_ms,
            min_bytes,
            max_bytes,
            isolation_level,
            session_id,
            session_epoch,
            topics,
            rack_id,
        })
    }
}

struct PartitionResult {
    partition_index: i32,
    error_code: ErrorCode,
    records: Vec<Bytes>,
}

struct TopicResult {
    topic_id: Uuid,
    partitions: Vec<PartitionResult>,
}

pub fn handle(req: &FetchRequest, metadata: &ClusterMetadata, log_dir: &Path) -> Bytes {
    let mut topics = Vec::with_capacity(req.topics.len());

    for topic_req in &req.topics {
        let topic_name = metadata.topic_name_owned(topic_req.topic_id);

        let partitions = match &topic_name {
            None => vec![PartitionResult {
                partition_index: 0,
                error_code: ErrorCode::UnknownTopicId,
                records: Vec::new(),
            }],
            Some(name) => topic_req
                .partitions
                .iter()
                .map(|p| {
                    let reader = SegmentReader::open_or_empty(log_dir, name, p.partition);
                    let records: Vec<Bytes> = reader
                        .filter_map(|batch| batch.ok())
                        .map(|batch| batch.raw)
                        .collect();
                    PartitionResult {
                        partition_index: p.partition,
                        error_code: ErrorCode::None,
                        records,
                    }
                })
                .collect(),
        };

        topics.push(TopicResult {
            topic_id: topic_req.topic_id,
            partitions,
        });
    }

    let mut enc = ByteEncoder::new();
    encode_response_header(&mut enc, ApiKey::Fetch, req.correlation_id);

    enc.put_i32(0); // throttle_time_ms
    enc.put_i16(ErrorCode::None.into());
    enc.put_i32(0); // session_id, always 0 — no session reuse
    enc.put_compact_array(&topics, |e, topic| {
        e.put_uuid(&topic.topic_id);
        e.put_compact_array(&topic.partitions, |e, partition| {
            e.put_i32(partition.partition_index);
            e.put_i16(partition.error_code.into());
            e.put_i64(0); // high_watermark
            e.put_i64(0); // last_stable_offset
            e.put_i64(0); // log_start_offset
            e.put_compact_array(&[] as &[()], |_, _| {}); // aborted_transactions
            e.put_i32(0); // preferred_read_replica
            let total_len: usize = partition.records.iter().map(|b| b.len()).sum();
            e.put_unsigned_varint(total_len as u32);
            for batch in &partition.records {
                e.put_bytes(batch);
            }
            e.put_tagged_fields();
        });
        e.put_tagged_fields();
    });
    enc.put_tagged_fields();

    enc.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_topic_id_reports_error_with_empty_records() {
        let metadata = ClusterMetadata::default();
        let req = FetchRequest {
            correlation_id: 1,
            max_wait_ms: 0,
            min_bytes: 0,
            max_bytes: 0,
            isolation_level: 0,
            session_id: 0,
            session_epoch: 0,
            topics: vec![FetchTopicRequest {
                topic_id: Uuid::from_u128(0x1111_2222),
                partitions: vec![FetchPartitionRequest {
                    partition: 0,
                    current_leader_epoch: 0,
                    fetch_offset: 0,
                    last_fetched_epoch: 0,
                    log_start_offset: 0,
                    partition_max_bytes: 0,
                }],
            }],
            rack_id: String::new(),
        };
        let dir = tempfile::tempdir().unwrap();
        let body = handle(&req, &metadata, dir.path());
        let mut dec = ByteDecoder::new(body);

        dec.get_i32().unwrap(); // correlation_id
        dec.get_tagged_fields().unwrap();
        dec.get_i32().unwrap(); // throttle_time_ms
        assert_eq!(dec.get_i16().unwrap(), 0); // top-level error_code NONE
        assert_eq!(dec.get_i32().unwrap(), 0); // session_id

        let topics = dec
            .get_compact_array(|d| {
                let _topic_id = d.get_uuid()?;
                let partitions = d.get_compact_array(|d| {
                    let partition_index = d.get_i32()?;
                    let error_code = d.get_i16()?;
                    d.get_i64()?; // high_watermark
                    d.get_i64()?; // last_stable_offset
                    d.get_i64()?; // log_start_offset
                    d.get_compact_array(|_| Ok(()))?; // aborted_transactions
                    d.get_i32()?; // preferred_read_replica
                    let records_len = d.get_unsigned_varint()?;
                    d.read_bytes(records_len as usize)?;
                    d.get_tagged_fields()?;
                    Ok((partition_index, error_code))
                })?;
                d.get_tagged_fields()?;
                Ok(partitions)
            })
            .unwrap();

        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].len(), 1);
        assert_eq!(topics[0][0], (0, 100)); // UNKNOWN_TOPIC_ID
    }

    #[test]
    fn known_partition_returns_on_disk_batch_byte_identical() {
        use crate::metadata::record_batch::test_support;

        let bar_id = Uuid::from_u128(0xba4_1d);
        let metadata_records = [
            test_support::record(&test_support::topic_record_value("bar", bar_id)),
            test_support::record(&test_support::partition_record_value(0, bar_id)),
        ];
        let metadata_log = test_support::batch(&metadata_records);

        let dir = tempfile::tempdir().unwrap();
        let cluster_dir = dir.path().join("__cluster_metadata-0");
        std::fs::create_dir_all(&cluster_dir).unwrap();
        std::fs::write(cluster_dir.join("00000000000000000000.log"), &metadata_log[..]).unwrap();
        let metadata = ClusterMetadata::load(dir.path()).unwrap();

        let partition_records = [test_support::record(&test_support::topic_record_value(
            "unused",
            Uuid::nil(),
        ))];
        let on_disk_batch = test_support::batch(&partition_records);
        let partition_dir = dir.path().join("bar-0");
        std::fs::create_dir_all(&partition_dir).unwrap();
        std::fs::write(
            partition_dir.join("00000000000000000000.log"),
            &on_disk_batch[..],
        )
        .unwrap();

        let req = FetchRequest {
            correlation_id: 1,
            max_wait_ms: 0,
            min_bytes: 0,
            max_bytes: 0,
            isolation_level: 0,
            session_id: 0,
            session_epoch: 0,
            topics: vec![FetchTopicRequest {
                topic_id: bar_id,
                partitions: vec![FetchPartitionRequest {
                    partition: 0,
                    current_leader_epoch: 0,
                    fetch_offset: 0,
                    last_fetched_epoch: 0,
                    log_start_offset: 0,
                    partition_max_bytes: 0,
                }],
            }],
            rack_id: String::new(),
        };
        let body = handle(&req, &metadata, dir.path());
        let mut dec = ByteDecoder::new(body);

        dec.get_i32().unwrap(); // correlation_id
        dec.get_tagged_fields().unwrap();
        dec.get_i32().unwrap(); // throttle_time_ms
        assert_eq!(dec.get_i16().unwrap(), 0); // top-level error_code
        dec.get_i32().unwrap(); // session_id

        let topics = dec
            .get_compact_array(|d| {
                let _topic_id = d.get_uuid()?;
                let partitions = d.get_compact_array(|d| {
                    let partition_index = d.get_i32()?;
                    let error_code = d.get_i16()?;
                    d.get_i64()?; // high_watermark
                    d.get_i64()?; // last_stable_offset
                    d.get_i64()?; // log_start_offset
                    d.get_compact_array(|_| Ok(()))?; // aborted_transactions
                    d.get_i32()?; // preferred_read_replica
                    let records_len = d.get_unsigned_varint()?;
                    let records = d.read_bytes(records_len as usize)?;
                    d.get_tagged_fields()?;
                    Ok((partition_index, error_code, records))
                })?;
                d.get_tagged_fields()?;
                Ok(partitions)
            })
            .unwrap();

        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].len(), 1);
        let (partition_index, error_code, records) = &topics[0][0];
        assert_eq!(*partition_index, 0);
        assert_eq!(*error_code, 0);
        assert_eq!(&records[..], &on_disk_batch[..]);
    }
}
