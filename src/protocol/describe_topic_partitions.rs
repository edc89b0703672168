//! DescribeTopicPartitions (key 75, v0).
//!
//! <https://kafka.apache.org/protocol.html#The_Messages_DescribeTopicPartitions>

use uuid::Uuid;

use crate::codec::{ByteDecoder, ByteEncoder};
use crate::error::{DecodeError, DecodeResult};
use crate::metadata::ClusterMetadata;

use super::{encode_response_header, ApiKey, ErrorCode};

#[derive(Debug)]
pub struct DescribeTopicPartitionsRequest {
    pub correlation_id: i32,
    pub topics: Vec<String>,
    #[allow(dead_code)]
    pub response_partition_limit: i32,
}

impl DescribeTopicPartitionsRequest {
    pub fn decode(src: &mut ByteDecoder, correlation_id: i32) -> DecodeResult<Self> {
        let topics = src.get_compact_array(|d| {
            let name = d.get_compact_string()?;
            d.get_tagged_fields()?;
            Ok(name)
        })?;
        let response_partition_limit = src.get_i32()?;
        decode_cursor(src)?;
        src.get_tagged_fields()?;

        Ok(Self {
            correlation_id,
            topics,
            response_partition_limit,
        })
    }
}

/// A single leading byte: `0xff` is the null cursor. Any other value
/// would begin a structured `{topic_name, partition_index}` cursor for
/// pagination, which no client in this server's supported subset sends;
/// treated as a decode error rather than guessed at.
fn decode_cursor(src: &mut ByteDecoder) -> DecodeResult<()> {
    let marker = src.get_u8()?;
    if marker != 0xff {
        return Err(DecodeError::UnsupportedCursor);
    }
    Ok(())
}

struct TopicResult {
    error_code: ErrorCode,
    name: String,
    topic_id: Uuid,
    partitions: Vec<i32>,
}

pub fn handle(req: &DescribeTopicPartitionsRequest, metadata: &ClusterMetadata) -> bytes::Bytes {
    let mut topics = Vec::with_capacity(req.topics.len());

    for name in &req.topics {
        let result = match metadata.topic_id(name) {
            None => TopicResult {
                error_code: ErrorCode::UnknownTopicOrPartition,
                name: name.clone(),
                topic_id: Uuid::nil(),
                partitions: Vec::new(),
            },
            Some(topic_id) => TopicResult {
                error_code: ErrorCode::None,
                name: name.clone(),
                topic_id,
                partitions: metadata.topic_partitions(topic_id).to_vec(),
            },
        };
        topics.push(result);
    }

    let mut enc = ByteEncoder::new();
    encode_response_header(&mut enc, ApiKey::DescribeTopicPartitions, req.correlation_id);

    enc.put_i32(0); // throttle_time_ms
    enc.put_compact_array(&topics, |e, topic| {
        e.put_i16(topic.error_code.into());
        e.put_compact_string(&topic.name);
        e.put_uuid(&topic.topic_id);
        e.put_bool(false); // is_internal
        e.put_compact_array(&topic.partitions, |e, &partition_index| {
            e.put_i16(ErrorCode::None.into());
            e.put_i32(partition_index);
            e.put_i32(0); // leader
            e.put_i32(0); // leader_epoch
            e.put_compact_array(&[] as &[i32], |_, _| {}); // replicas
            e.put_compact_array(&[] as &[i32], |_, _| {}); // isr
            e.put_compact_array(&[] as &[i32], |_, _| {}); // eligible_leader_replicas
            e.put_compact_array(&[] as &[i32], |_, _| {}); // last_known_elr
            e.put_compact_array(&[] as &[i32], |_, _| {}); // offline_replicas
            e.put_tagged_fields();
        });
        e.put_i32(0); // topic_authorized_operations
        e.put_tagged_fields();
    });
    enc.put_u8(0xff); // next_cursor = null
    enc.put_tagged_fields();

    enc.into_bytes()
}
