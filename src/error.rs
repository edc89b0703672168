use thiserror::Error;

/// Decoding errors are connection-fatal: on any of these the connection
/// loop logs and closes the socket rather than reporting an in-band
/// Kafka error code. Protocol-level results (`ErrorCode`) are a
/// different layer entirely and never wrapped in this type.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("truncated input: needed {needed} bytes, had {available}")]
    Truncated { needed: usize, available: usize },

    #[error("malformed varint: exceeded maximum width")]
    MalformedVarint,

    #[error("unsupported tagged fields byte: {0:#x}")]
    UnsupportedTaggedFields(u8),

    #[error("{0} extraneous bytes remaining after decoding request body")]
    ExtraneousRequestBytes(usize),

    #[error("unsupported api key: {0}")]
    UnsupportedApiKey(i16),

    #[error("non-null cursor is not supported")]
    UnsupportedCursor,

    #[error("compact string field must not be null")]
    UnexpectedNullString,

    #[error("i/o error reading log segment: {0}")]
    Io(#[from] std::io::Error),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
