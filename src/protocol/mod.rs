//! Request/response framing and the API key / error code vocabularies.
//!
//! <https://kafka.apache.org/protocol.html#protocol_messages>

pub mod api_versions;
pub mod describe_topic_partitions;
pub mod fetch;

use bytes::Bytes;

use crate::codec::{ByteDecoder, ByteEncoder};
use crate::error::{DecodeError, DecodeResult};

/// <https://kafka.apache.org/protocol.html#protocol_api_keys>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum ApiKey {
    Fetch = 1,
    ApiVersions = 18,
    DescribeTopicPartitions = 75,
}

impl ApiKey {
    pub fn from_i16(v: i16) -> DecodeResult<Self> {
        match v {
            1 => Ok(Self::Fetch),
            18 => Ok(Self::ApiVersions),
            75 => Ok(Self::DescribeTopicPartitions),
            other => Err(DecodeError::UnsupportedApiKey(other)),
        }
    }
}

impl From<ApiKey> for i16 {
    fn from(k: ApiKey) -> i16 {
        k as i16
    }
}

/// <https://kafka.apache.org/protocol.html#protocol_error_codes>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum ErrorCode {
    None = 0,
    UnknownTopicOrPartition = 3,
    UnsupportedVersion = 35,
    UnknownTopicId = 100,
}

impl From<ErrorCode> for i16 {
    fn from(e: ErrorCode) -> i16 {
        e as i16
    }
}

/// RequestHeader (v2): api_key, api_version, correlation_id, client_id,
/// tagged_fields.
#[derive(Debug)]
pub struct RequestHeader {
    pub api_key: i16,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: Option<String>,
}

impl RequestHeader {
    pub fn decode(src: &mut ByteDecoder) -> DecodeResult<Self> {
        let api_key = src.get_i16()?;
        let api_version = src.get_i16()?;
        let correlation_id = src.get_i32()?;
        let client_id = src.get_nullable_string()?;
        src.get_tagged_fields()?;

        Ok(Self {
            api_key,
            api_version,
            correlation_id,
            client_id,
        })
    }
}

/// Selects v0 (ApiVersions) or v1 (everything else) response header
/// framing, per spec.
pub fn encode_response_header(enc: &mut ByteEncoder, api_key: ApiKey, correlation_id: i32) {
    enc.put_i32(correlation_id);
    if api_key != ApiKey::ApiVersions {
        enc.put_tagged_fields();
    }
}

/// Prepends a 4-byte big-endian length prefix to a fully encoded
/// response message (header + body already concatenated).
pub fn frame_message(body: Bytes) -> Bytes {
    let mut enc = ByteEncoder::new();
    enc.put_i32(body.len() as i32);
    enc.put_bytes(&body);
    enc.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_message_prepends_correct_length() {
        let body = Bytes::from_static(&[1, 2, 3, 4, 5]);
        let framed = frame_message(body.clone());
        assert_eq!(framed.len(), 4 + body.len());
        assert_eq!(
            i32::from_be_bytes(framed[0..4].try_into().unwrap()) as usize,
            body.len()
        );
        assert_eq!(&framed[4..], &body[..]);
    }
}
