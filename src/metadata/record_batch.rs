//! RecordBatch and Record decoding, magic version 2.
//!
//! <https://kafka.apache.org/documentation/#recordbatch>

use bytes::Bytes;
use uuid::Uuid;

use crate::codec::ByteDecoder;
use crate::error::DecodeResult;

#[derive(Debug)]
#[allow(dead_code)]
pub struct RecordBatch {
    pub base_offset: i64,
    pub batch_length: i32,
    pub partition_leader_epoch: i32,
    pub magic: i8,
    pub crc: u32,
    pub attributes: i16,
    pub last_offset_delta: i32,
    pub base_timestamp: i64,
    pub max_timestamp: i64,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub base_sequence: i32,
    pub records: Vec<Record>,
    /// The exact bytes this batch was decoded from, preserved so Fetch
    /// can re-emit them byte-for-byte instead of re-encoding.
    pub raw: Bytes,
}

impl RecordBatch {
    /// Decodes one RecordBatch starting at the current position of
    /// `src`. Reads the 12-byte prefix (base_offset, batch_length),
    /// then bounds the remainder to exactly `batch_length` bytes so a
    /// truncated batch body is caught locally rather than overrunning
    /// into the next batch.
    pub fn decode(src: &mut ByteDecoder) -> DecodeResult<Self> {
        let snapshot = src.peek_remaining();

        let base_offset = src.get_i64()?;
        let batch_length = src.get_i32()?;
        let mut body = src.read_bounded(batch_length as usize)?;

        let partition_leader_epoch = body.get_i32()?;
        let magic = body.get_i8()?;
        let crc = body.get_u32()?;
        let attributes = body.get_i16()?;
        let last_offset_delta = body.get_i32()?;
        let base_timestamp = body.get_i64()?;
        let max_timestamp = body.get_i64()?;
        let producer_id = body.get_i64()?;
        let producer_epoch = body.get_i16()?;
        let base_sequence = body.get_i32()?;
        let records = body.get_array(Record::decode)?;

        let total_len = 12 + batch_length as usize;
        let raw = snapshot.slice(0..total_len);

        Ok(Self {
            base_offset,
            batch_length,
            partition_leader_epoch,
            magic,
            crc,
            attributes,
            last_offset_delta,
            base_timestamp,
            max_timestamp,
            producer_id,
            producer_epoch,
            base_sequence,
            records,
            raw,
        })
    }
}

/// A single record inside a RecordBatch. `value` is kept as the raw,
/// undecoded payload bytes: a record's value only has metadata-record
/// semantics (`MetadataRecordValue`) when it comes from the
/// `__cluster_metadata` partition. Records read off a data partition by
/// Fetch carry arbitrary producer payloads and must decode structurally
/// regardless of what's inside — see `MetadataRecordValue::decode` for
/// the metadata-scan-only interpretation of this field.
#[derive(Debug)]
#[allow(dead_code)]
pub struct Record {
    pub length: i32,
    pub attributes: i8,
    pub timestamp_delta: i64,
    pub offset_delta: i32,
    pub key: Option<Bytes>,
    pub value: Bytes,
    pub headers: Vec<RecordHeader>,
}

impl Record {
    pub fn decode(src: &mut ByteDecoder) -> DecodeResult<Self> {
        let length = src.get_varint()?;
        let mut body = src.read_bounded(length.unsigned_abs() as usize)?;

        let attributes = body.get_i8()?;
        let timestamp_delta = body.get_varlong()?;
        let offset_delta = body.get_varint()?;

        let key = decode_varint_prefixed_bytes(&mut body)?;

        let value_length = body.get_varint()?;
        let value = body.read_bytes(value_length.max(0) as usize)?;

        let header_count = body.get_unsigned_varint()?;
        let mut headers = Vec::with_capacity(header_count as usize);
        for _ in 0..header_count {
            headers.push(RecordHeader::decode(&mut body)?);
        }

        Ok(Self {
            length,
            attributes,
            timestamp_delta,
            offset_delta,
            key,
            value,
            headers,
        })
    }
}

fn decode_varint_prefixed_bytes(src: &mut ByteDecoder) -> DecodeResult<Option<Bytes>> {
    let len = src.get_varint()?;
    if len < 0 {
        Ok(None)
    } else {
        Ok(Some(src.read_bytes(len as usize)?))
    }
}

#[derive(Debug)]
#[allow(dead_code)]
pub struct RecordHeader {
    pub key: String,
    pub value: Option<Bytes>,
}

impl RecordHeader {
    fn decode(src: &mut ByteDecoder) -> DecodeResult<Self> {
        let key_len = src.get_varint()?;
        let key_bytes = src.read_bytes(key_len.max(0) as usize)?;
        let key = String::from_utf8_lossy(&key_bytes).into_owned();
        let value = decode_varint_prefixed_bytes(src)?;
        Ok(Self { key, value })
    }
}

/// Metadata-record value, discriminated on `record_type` per the
/// `__cluster_metadata` log schema. Decoded explicitly by the metadata
/// scan from a `Record`'s raw `value` bytes — never by `Record::decode`
/// itself, since only the `__cluster_metadata` partition's records carry
/// this schema. `Unknown` carries the raw value bytes so unrecognized
/// record types don't abort decoding — the metadata index simply
/// ignores them.
#[derive(Debug)]
#[allow(dead_code)]
pub enum MetadataRecordValue {
    Topic(TopicRecord),
    Partition(PartitionRecord),
    FeatureLevel(FeatureLevelRecord),
    Unknown { record_type: i8, raw: Bytes },
}

#[derive(Debug)]
pub struct TopicRecord {
    pub name: String,
    pub topic_id: Uuid,
}

#[derive(Debug)]
#[allow(dead_code)]
pub struct PartitionRecord {
    pub partition_id: i32,
    pub topic_id: Uuid,
    pub replicas: Vec<i32>,
    pub in_sync_replicas: Vec<i32>,
    pub removing_replicas: Vec<i32>,
    pub adding_replicas: Vec<i32>,
    pub leader: i32,
    pub leader_epoch: i32,
    pub partition_epoch: i32,
    pub directories: Vec<Uuid>,
}

#[derive(Debug)]
#[allow(dead_code)]
pub struct FeatureLevelRecord {
    pub name: String,
    pub feature_level: i16,
}

/// Hand-rolled encoders for the on-disk record formats, used only to
/// build fixture log segments in tests. The server itself never writes
/// this format — it's a pure reader.
#[cfg(test)]
pub(crate) mod test_support {
    use bytes::{BufMut, Bytes, BytesMut};
    use uuid::Uuid;

    use crate::codec::ByteEncoder;

    fn zigzag32(v: i32) -> u32 {
        ((v << 1) ^ (v >> 31)) as u32
    }

    fn zigzag64(v: i64) -> u64 {
        ((v << 1) ^ (v >> 63)) as u64
    }

    fn put_varint(buf: &mut BytesMut, v: i32) {
        let mut enc = ByteEncoder::new();
        enc.put_unsigned_varint(zigzag32(v));
        buf.extend_from_slice(&enc.into_bytes());
    }

    fn put_varlong(buf: &mut BytesMut, v: i64) {
        let mut z = zigzag64(v);
        loop {
            let byte = (z & 0x7f) as u8;
            z >>= 7;
            if z == 0 {
                buf.put_u8(byte);
                break;
            }
            buf.put_u8(byte | 0x80);
        }
    }

    pub(crate) fn topic_record_value(name: &str, topic_id: Uuid) -> Bytes {
        let mut enc = ByteEncoder::new();
        enc.put_i8(1); // frame_version
        enc.put_i8(2); // record_type = Topic
        enc.put_i8(0); // version
        enc.put_compact_string(name);
        enc.put_uuid(&topic_id);
        enc.put_tagged_fields();
        enc.into_bytes()
    }

    pub(crate) fn partition_record_value(partition_id: i32, topic_id: Uuid) -> Bytes {
        let mut enc = ByteEncoder::new();
        enc.put_i8(1); // frame_version
        enc.put_i8(3); // record_type = Partition
        enc.put_i8(0); // version
        enc.put_i32(partition_id);
        enc.put_uuid(&topic_id);
        let empty: [i32; 0] = [];
        enc.put_compact_array(&empty, |_, _| {}); // replicas
        enc.put_compact_array(&empty, |_, _| {}); // isr
        enc.put_compact_array(&empty, |_, _| {}); // removing
        enc.put_compact_array(&empty, |_, _| {}); // adding
        enc.put_i32(0); // leader
        enc.put_i32(0); // leader_epoch
        enc.put_i32(0); // partition_epoch
        let empty_uuids: [Uuid; 0] = [];
        enc.put_compact_array(&empty_uuids, |_, _| {}); // directories
        enc.put_tagged_fields();
        enc.into_bytes()
    }

    /// Wraps a record value in the full varint-framed Record envelope.
    pub(crate) fn record(value: &[u8]) -> Bytes {
        let mut body = BytesMut::new();
        body.put_i8(0); // attributes
        put_varlong(&mut body, 0); // timestamp_delta
        put_varint(&mut body, 0); // offset_delta
        put_varint(&mut body, -1); // key = null
        put_varint(&mut body, value.len() as i32);
        body.extend_from_slice(value);
        body.put_u8(0); // header_count (uvarint 0)

        let mut out = BytesMut::new();
        put_varint(&mut out, body.len() as i32);
        out.extend_from_slice(&body);
        out.freeze()
    }

    /// Wraps a sequence of already-framed records in a full RecordBatch,
    /// exactly as it would appear on disk.
    pub(crate) fn batch(records: &[Bytes]) -> Bytes {
        let mut body = BytesMut::new();
        body.put_i32(0); // partition_leader_epoch
        body.put_i8(2); // magic
        body.put_u32(0); // crc (unchecked by this server)
        body.put_i16(0); // attributes
        body.put_i32((records.len() as i32) - 1); // last_offset_delta
        body.put_i64(0); // base_timestamp
        body.put_i64(0); // max_timestamp
        body.put_i64(-1); // producer_id
        body.put_i16(-1); // producer_epoch
        body.put_i32(-1); // base_sequence
        body.put_i32(records.len() as i32); // records array length
        for r in records {
            body.extend_from_slice(r);
        }

        let mut out = BytesMut::new();
        out.put_i64(0); // base_offset
        out.put_i32(body.len() as i32); // batch_length
        out.extend_from_slice(&body);
        out.freeze()
    }
}

impl MetadataRecordValue {
    pub fn decode(src: &mut ByteDecoder) -> DecodeResult<Self> {
        let _frame_version = src.get_i8()?;
        let record_type = src.get_i8()?;
        let _version = src.get_i8()?;

        let value = match record_type {
            2 => {
                let name = src.get_compact_string()?;
                let topic_id = src.get_uuid()?;
                src.get_tagged_fields()?;
                MetadataRecordValue::Topic(TopicRecord { name, topic_id })
            }
            3 => {
                let partition_id = src.get_i32()?;
                let topic_id = src.get_uuid()?;
                let replicas = src.get_compact_array(|d| d.get_i32())?;
                let in_sync_replicas = src.get_compact_array(|d| d.get_i32())?;
                let removing_replicas = src.get_compact_array(|d| d.get_i32())?;
                let adding_replicas = src.get_compact_array(|d| d.get_i32())?;
                let leader = src.get_i32()?;
                let leader_epoch = src.get_i32()?;
                let partition_epoch = src.get_i32()?;
                let directories = src.get_compact_array(|d| d.get_uuid())?;
                src.get_tagged_fields()?;
                MetadataRecordValue::Partition(PartitionRecord {
                    partition_id,
                    topic_id,
                    replicas,
                    in_sync_replicas,
                    removing_replicas,
                    adding_replicas,
                    leader,
                    leader_epoch,
                    partition_epoch,
                    directories,
                })
            }
            12 => {
                let name = src.get_compact_string()?;
                let feature_level = src.get_i16()?;
                src.get_tagged_fields()?;
                MetadataRecordValue::FeatureLevel(FeatureLevelRecord { name, feature_level })
            }
            other => MetadataRecordValue::Unknown {
                record_type: other,
                raw: src.read_bytes(src.remaining())?,
            },
        };

        Ok(value)
    }
}
