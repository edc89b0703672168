//! ApiVersions (key 18, v4).
//!
//! <https://kafka.apache.org/protocol.html#The_Messages_ApiVersions>

use bytes::Bytes;

use crate::codec::{ByteDecoder, ByteEncoder};
use crate::error::DecodeResult;

use super::{encode_response_header, ApiKey, ErrorCode};

#[derive(Debug)]
pub struct ApiVersionsRequest {
    pub correlation_id: i32,
    pub api_version: i16,
    #[allow(dead_code)]
    pub client_software_name: String,
    #[allow(dead_code)]
    pub client_software_version: String,
}

impl ApiVersionsRequest {
    pub fn decode(
        src: &mut ByteDecoder,
        correlation_id: i32,
        api_version: i16,
    ) -> DecodeResult<Self> {
        let client_software_name = src.get_compact_string()?;
        let client_software_version = src.get_compact_string()?;
        src.get_tagged_fields()?;

        Ok(Self {
            correlation_id,
            api_version,
            client_software_name,
            client_software_version,
        })
    }
}

struct SupportedApiKey {
    api_key: ApiKey,
    min_version: i16,
    max_version: i16,
}

/// The advertised API surface. Only v4 of ApiVersions itself is
/// accepted as fully supported (spec's Open Question resolution); the
/// advertised min/max below reflect what this server actually serves.
const SUPPORTED_API_KEYS: [SupportedApiKey; 3] = [
    SupportedApiKey {
        api_key: ApiKey::ApiVersions,
        min_version: 4,
        max_version: 4,
    },
    SupportedApiKey {
        api_key: ApiKey::DescribeTopicPartitions,
        min_version: 0,
        max_version: 0,
    },
    SupportedApiKey {
        api_key: ApiKey::Fetch,
        min_version: 16,
        max_version: 16,
    },
];

pub fn handle(req: &ApiVersionsRequest) -> Bytes {
    let error_code = if req.api_version == 4 {
        ErrorCode::None
    } else {
        ErrorCode::UnsupportedVersion
    };

    let mut enc = ByteEncoder::new();
    encode_response_header(&mut enc, ApiKey::ApiVersions, req.correlation_id);

    enc.put_i16(error_code.into());
    enc.put_compact_array(&SUPPORTED_API_KEYS, |e, k| {
        e.put_i16(k.api_key.into());
        e.put_i16(k.min_version);
        e.put_i16(k.max_version);
        e.put_tagged_fields();
    });
    enc.put_i32(0); // throttle_time_ms
    enc.put_tagged_fields();

    enc.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ByteDecoder;

    fn fixture_request(api_version: i16) -> ApiVersionsRequest {
        ApiVersionsRequest {
            correlation_id: 0x1122_3344,
            api_version,
            client_software_name: "kafka-cli".to_string(),
            client_software_version: "0.1.0".to_string(),
        }
    }

    #[test]
    fn v4_request_succeeds() {
        let req = fixture_request(4);
        let body = handle(&req);
        let mut dec = ByteDecoder::new(body);

        assert_eq!(dec.get_i32().unwrap(), 0x1122_3344); // header v0, no tag buffer
        assert_eq!(dec.get_i16().unwrap(), 0); // error_code = NONE

        let keys = dec
            .get_compact_array(|d| {
                let api_key = d.get_i16()?;
                let min = d.get_i16()?;
                let max = d.get_i16()?;
                d.get_tagged_fields()?;
                Ok((api_key, min, max))
            })
            .unwrap();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&(18, 4, 4)));
        assert!(keys.contains(&(75, 0, 0)));
        assert!(keys.contains(&(1, 16, 16)));

        assert_eq!(dec.get_i32().unwrap(), 0); // throttle_time_ms
        dec.get_tagged_fields().unwrap();
        assert!(dec.is_empty());
    }

    #[test]
    fn unsupported_version_reports_error_but_still_lists_apis() {
        let req = fixture_request(3);
        let body = handle(&req);
        let mut dec = ByteDecoder::new(body);

        dec.get_i32().unwrap(); // correlation_id
        assert_eq!(dec.get_i16().unwrap(), 35); // UNSUPPORTED_VERSION
    }
}
