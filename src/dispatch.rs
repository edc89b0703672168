//! Decodes the request header, chooses the body decoder by `api_key`,
//! and dispatches to the matching handler.

use std::path::Path;

use bytes::Bytes;

use crate::codec::ByteDecoder;
use crate::error::{DecodeError, DecodeResult};
use crate::metadata::ClusterMetadata;
use crate::protocol::{self, api_versions, describe_topic_partitions, fetch, ApiKey};

/// Decodes and dispatches one framed request message (the bytes after
/// the 4-byte length prefix has already been stripped), returning the
/// fully-framed response ready to write to the socket.
pub fn handle_request(
    msg: Bytes,
    metadata: &ClusterMetadata,
    log_dir: &Path,
) -> DecodeResult<Bytes> {
    let mut src = ByteDecoder::new(msg);
    let header = protocol::RequestHeader::decode(&mut src)?;
    let api_key = ApiKey::from_i16(header.api_key)?;

    let body = match api_key {
        ApiKey::ApiVersions => {
            let req = api_versions::ApiVersionsRequest::decode(
                &mut src,
                header.correlation_id,
                header.api_version,
            )?;
            api_versions::handle(&req)
        }
        ApiKey::DescribeTopicPartitions => {
            let req = describe_topic_partitions::DescribeTopicPartitionsRequest::decode(
                &mut src,
                header.correlation_id,
            )?;
            describe_topic_partitions::handle(&req, metadata)
        }
        ApiKey::Fetch => {
            let req = fetch::FetchRequest::decode(&mut src, header.correlation_id)?;
            fetch::handle(&req, metadata, log_dir)
        }
    };

    if !src.is_empty() {
        return Err(DecodeError::ExtraneousRequestBytes(src.remaining()));
    }

    Ok(protocol::frame_message(body))
}
